use crate::gate::{FileSettingsStore, ProtectionGate};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub settings_path: PathBuf,
    pub public_url: Url,
}

/// Print a fresh share link, or explain why none can be issued.
/// # Errors
/// Returns an error if the settings record cannot be read.
pub fn execute(args: &Args) -> Result<()> {
    let gate = ProtectionGate::new(Arc::new(FileSettingsStore::new(&args.settings_path)));
    match gate.shared_access_link(&args.public_url)? {
        Some(link) => println!("{link}"),
        None => println!(
            "Share links are unavailable: protection and share access must be enabled and a password set."
        ),
    }
    Ok(())
}
