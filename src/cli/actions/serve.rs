use crate::{
    api::{self, handlers::GateState},
    gate::{FileSettingsStore, ProtectionGate},
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub settings_path: PathBuf,
    pub public_url: Url,
}

/// Execute the serve action.
/// # Errors
/// Returns an error if the settings record is unreadable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let gate = ProtectionGate::new(Arc::new(FileSettingsStore::new(&args.settings_path)));

    // Fail at startup rather than on the first request; this also persists the site salt.
    let snapshot = gate.snapshot()?;
    if snapshot.settings.enabled && !snapshot.settings.has_password() {
        warn!(
            "Protection is enabled but no password is set; run `blogpass password` to set one"
        );
    }

    let cookie_secure = args.public_url.scheme() == "https";
    if !cookie_secure {
        warn!("Public URL is not https, access cookies are sent without the Secure attribute");
    }

    info!(
        settings = %args.settings_path.display(),
        public_url = %args.public_url,
        "Starting blogpass"
    );

    api::new(args.port, Arc::new(GateState::new(gate, cookie_secure))).await
}
