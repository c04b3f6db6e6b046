use crate::gate::{FileSettingsStore, SettingsStore, store::load_settings};
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub settings_path: PathBuf,
    pub password: SecretString,
}

/// Hash and store a new shared password.
/// # Errors
/// Returns an error if the password is empty or the settings record cannot be written.
pub fn execute(args: &Args) -> Result<()> {
    let store = FileSettingsStore::new(&args.settings_path);
    let mut settings = load_settings(&store)?;
    settings.set_password(&args.password)?;
    store.put(&settings)?;

    info!(settings = %args.settings_path.display(), "Shared password updated");
    println!("Password updated. Existing access cookies and share links are no longer valid.");

    Ok(())
}
