use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_SETTINGS: &str = "settings";
pub const ARG_PUBLIC_URL: &str = "public-url";

pub const DEFAULT_SETTINGS_PATH: &str = "blogpass.json";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080/";

/// Location of the settings record, shared by every subcommand.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_SETTINGS)
            .short('s')
            .long("settings")
            .help("Path to the JSON settings record (created on first write)")
            .env("BLOGPASS_SETTINGS")
            .default_value(DEFAULT_SETTINGS_PATH)
            .global(true)
            .value_parser(clap::value_parser!(PathBuf)),
    )
}

#[must_use]
pub fn public_url_arg() -> Arg {
    Arg::new(ARG_PUBLIC_URL)
        .long("public-url")
        .help("Public URL of the blog; https enables the Secure cookie attribute")
        .env("BLOGPASS_PUBLIC_URL")
        .default_value(DEFAULT_PUBLIC_URL)
        .value_parser(clap::value_parser!(url::Url))
}

/// # Errors
/// Returns an error if the settings path is missing from the matches.
pub fn settings_path(matches: &ArgMatches) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>(ARG_SETTINGS)
        .cloned()
        .context("missing required argument: --settings")
}
