pub mod logging;
pub mod settings;
pub mod store;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const CMD_SERVE: &str = "serve";
pub const CMD_PASSWORD: &str = "password";
pub const CMD_SHARE_LINK: &str = "share-link";

pub const ARG_PORT: &str = "port";
pub const ARG_PASSWORD: &str = "password";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("blogpass")
        .about("Shared password protection for blog content")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_SERVE)
                .about("Serve the gate over HTTP")
                .arg(
                    Arg::new(ARG_PORT)
                        .short('p')
                        .long("port")
                        .help("Port to listen on")
                        .default_value("8080")
                        .env("BLOGPASS_PORT")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(store::public_url_arg()),
        )
        .subcommand(
            Command::new(CMD_PASSWORD)
                .about("Set the shared password (invalidates every issued cookie and share link)")
                .arg(
                    Arg::new(ARG_PASSWORD)
                        .long("password")
                        .help("New shared password")
                        .env("BLOGPASS_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_SHARE_LINK)
                .about("Print a time limited link that grants access without the password")
                .arg(store::public_url_arg()),
        )
        .subcommand(settings::subcommand());

    let command = store::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "blogpass");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Shared password protection for blog content"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_serve_defaults() {
        temp_env::with_vars(
            [
                ("BLOGPASS_PORT", None::<&str>),
                ("BLOGPASS_SETTINGS", None),
                ("BLOGPASS_PUBLIC_URL", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["blogpass", "serve"]);
                let (name, sub) = matches.subcommand().unwrap();
                assert_eq!(name, CMD_SERVE);
                assert_eq!(sub.get_one::<u16>(ARG_PORT).copied(), Some(8080));
                assert_eq!(
                    sub.get_one::<url::Url>(store::ARG_PUBLIC_URL)
                        .map(url::Url::as_str),
                    Some(store::DEFAULT_PUBLIC_URL)
                );
                assert_eq!(
                    matches.get_one::<PathBuf>(store::ARG_SETTINGS),
                    Some(&PathBuf::from(store::DEFAULT_SETTINGS_PATH))
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("BLOGPASS_PORT", Some("443")),
                ("BLOGPASS_SETTINGS", Some("/var/lib/blogpass/settings.json")),
                ("BLOGPASS_PUBLIC_URL", Some("https://blog.example.com/")),
                ("BLOGPASS_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["blogpass", "serve"]);
                let sub = matches.subcommand_matches(CMD_SERVE).unwrap();
                assert_eq!(sub.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    sub.get_one::<url::Url>(store::ARG_PUBLIC_URL)
                        .map(url::Url::scheme),
                    Some("https")
                );
                assert_eq!(
                    matches.get_one::<PathBuf>(store::ARG_SETTINGS),
                    Some(&PathBuf::from("/var/lib/blogpass/settings.json"))
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_password_from_env() {
        temp_env::with_vars([("BLOGPASS_PASSWORD", Some("hunter2"))], || {
            let matches = new().get_matches_from(vec!["blogpass", "password"]);
            let sub = matches.subcommand_matches(CMD_PASSWORD).unwrap();
            assert_eq!(
                sub.get_one::<String>(ARG_PASSWORD).map(String::as_str),
                Some("hunter2")
            );
        });
    }

    #[test]
    fn test_password_required() {
        temp_env::with_vars([("BLOGPASS_PASSWORD", None::<&str>)], || {
            let result = new().try_get_matches_from(vec!["blogpass", "password"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_invalid_public_url() {
        let result =
            new().try_get_matches_from(vec!["blogpass", "share-link", "--public-url", "not a url"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_set_is_nested() {
        let matches = new().get_matches_from(vec![
            "blogpass",
            "settings",
            "set",
            "--home-page-protected",
            "true",
        ]);
        let settings_matches = matches.subcommand_matches(settings::CMD_SETTINGS).unwrap();
        let set = settings_matches.subcommand_matches(settings::CMD_SET).unwrap();
        assert_eq!(
            set.get_one::<bool>(settings::ARG_HOME_PAGE_PROTECTED).copied(),
            Some(true)
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("BLOGPASS_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["blogpass", "share-link"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("BLOGPASS_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["blogpass".to_string(), "share-link".to_string()];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }
}
