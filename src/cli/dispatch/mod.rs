//! Map parsed CLI arguments to the action the binary executes.

use crate::cli::{
    actions::{Action, password, serve, settings, share_link},
    commands::{self, settings as settings_command, store},
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use url::Url;

/// # Errors
/// Returns an error if the subcommand is unknown or required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let settings_path = store::settings_path(matches)?;

    match matches.subcommand() {
        Some((commands::CMD_SERVE, sub)) => Ok(Action::Serve(serve::Args {
            port: sub
                .get_one::<u16>(commands::ARG_PORT)
                .copied()
                .unwrap_or(8080),
            settings_path,
            public_url: public_url(sub)?,
        })),
        Some((commands::CMD_PASSWORD, sub)) => {
            let password = sub
                .get_one::<String>(commands::ARG_PASSWORD)
                .cloned()
                .context("missing required argument: --password")?;
            Ok(Action::Password(password::Args {
                settings_path,
                password: SecretString::from(password),
            }))
        }
        Some((commands::CMD_SHARE_LINK, sub)) => Ok(Action::ShareLink(share_link::Args {
            settings_path,
            public_url: public_url(sub)?,
        })),
        Some((settings_command::CMD_SETTINGS, sub)) => match sub.subcommand() {
            Some((settings_command::CMD_SHOW, _)) => {
                Ok(Action::ShowSettings(settings::ShowArgs { settings_path }))
            }
            Some((settings_command::CMD_SET, set)) => {
                Ok(Action::UpdateSettings(settings::UpdateArgs {
                    settings_path,
                    update: settings_command::parse_update(set),
                }))
            }
            _ => Err(anyhow!("missing settings subcommand")),
        },
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

fn public_url(matches: &clap::ArgMatches) -> Result<Url> {
    matches
        .get_one::<Url>(store::ARG_PUBLIC_URL)
        .cloned()
        .context("missing required argument: --public-url")
}
