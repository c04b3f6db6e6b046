use crate::gate::{FileSettingsStore, Settings, SettingsStore, SettingsUpdate, store::load_settings};
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use tracing::info;

const HIDDEN_HASH: &str = "<set>";

#[derive(Debug)]
pub struct ShowArgs {
    pub settings_path: PathBuf,
}

#[derive(Debug)]
pub struct UpdateArgs {
    pub settings_path: PathBuf,
    pub update: SettingsUpdate,
}

/// Print the effective settings, defaults included.
/// # Errors
/// Returns an error if the settings record cannot be read.
pub fn show(args: &ShowArgs) -> Result<()> {
    let settings = load_settings(&FileSettingsStore::new(&args.settings_path))?;
    println!("{}", render(&settings)?);
    Ok(())
}

/// Apply the given fields to the stored record and print the result.
/// # Errors
/// Returns an error if nothing was given or the record cannot be read or written.
pub fn update(args: UpdateArgs) -> Result<()> {
    if args.update.is_empty() {
        return Err(anyhow!("no settings given to change"));
    }

    let store = FileSettingsStore::new(&args.settings_path);
    let settings = args.update.apply(load_settings(&store)?);
    store.put(&settings)?;

    info!(settings = %args.settings_path.display(), "Settings updated");
    println!("{}", render(&settings)?);
    Ok(())
}

fn render(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    if shown.has_password() {
        shown.password_hash = Some(HIDDEN_HASH.to_string());
    }
    serde_json::to_string_pretty(&shown).context("Failed to encode settings")
}
