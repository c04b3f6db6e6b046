//! Access gate for password protected blog content.
//!
//! [`ProtectionGate`] loads a [`Snapshot`] (settings + site salt) from the
//! store on every call and evaluates it; nothing is cached between requests.
//! The free functions in this module do the same work against an explicit
//! snapshot so hosts that already hold one can skip the store round trip.

pub mod context;
pub mod decision;
pub mod error;
pub mod settings;
pub mod share;
pub mod store;
pub mod token;

pub use context::{RequestContext, ResourceType};
pub use decision::{PopupView, popup, requires_challenge, select_message};
pub use error::GateError;
pub use settings::{Settings, SettingsUpdate};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use token::SiteSalt;

use secrecy::SecretString;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

/// Settings and salt as read for a single request.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub settings: Settings,
    pub salt: SiteSalt,
}

impl Snapshot {
    #[must_use]
    pub fn new(settings: Settings, salt: SiteSalt) -> Self {
        Self { settings, salt }
    }

    /// One read of the record. The salt is generated and stored only when
    /// the record has none yet.
    ///
    /// # Errors
    /// Returns [`GateError::Store`] if the store cannot be read or the salt
    /// cannot be created.
    pub fn load(store: &dyn SettingsStore) -> Result<Self, GateError> {
        let (settings, salt) = store.read_record()?;
        let salt = match salt {
            Some(salt) => salt,
            None => store::load_site_salt(store)?,
        };
        Ok(Self {
            settings: store::settings_or_default(settings),
            salt,
        })
    }
}

/// Outcome for one request/content pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    /// Show the popup; content is replaced by the restricted message.
    Challenge,
    /// Feeds cannot show a popup, only the feed message.
    ReplaceWithMessage,
}

/// A freshly issued access token and the cookie lifetime to apply to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub max_age_seconds: u64,
}

#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[must_use]
pub fn evaluate(snapshot: &Snapshot, ctx: &RequestContext) -> Verdict {
    evaluate_at(snapshot, ctx, unix_now())
}

#[must_use]
pub fn evaluate_at(snapshot: &Snapshot, ctx: &RequestContext, now: u64) -> Verdict {
    if !requires_challenge(&snapshot.settings, ctx) {
        return Verdict::Pass;
    }
    if check_cookie(snapshot, ctx.presented_cookie_token.as_deref()) {
        return Verdict::Pass;
    }
    if ctx
        .presented_share_capability
        .as_deref()
        .is_some_and(|capability| share::verify(&snapshot.settings, &snapshot.salt, capability, now))
    {
        return Verdict::Pass;
    }
    if ctx.is_feed {
        Verdict::ReplaceWithMessage
    } else {
        Verdict::Challenge
    }
}

/// Return `raw` untouched on [`Verdict::Pass`], the restricted message otherwise.
#[must_use]
pub fn filter_content(snapshot: &Snapshot, ctx: &RequestContext, raw: &str) -> String {
    filter_content_at(snapshot, ctx, raw, unix_now())
}

#[must_use]
pub fn filter_content_at(snapshot: &Snapshot, ctx: &RequestContext, raw: &str, now: u64) -> String {
    match evaluate_at(snapshot, ctx, now) {
        Verdict::Pass => raw.to_string(),
        Verdict::Challenge | Verdict::ReplaceWithMessage => restricted_paragraph(snapshot, ctx),
    }
}

/// Verify the shared password and issue the access token.
///
/// Disabled protection, an unset password and a wrong password all map to
/// [`GateError::IncorrectPassword`].
///
/// # Errors
/// Returns [`GateError::IncorrectPassword`] when access is not granted.
pub fn check_password(
    snapshot: &Snapshot,
    supplied: &SecretString,
) -> Result<IssuedToken, GateError> {
    let settings = &snapshot.settings;
    if !settings.enabled {
        debug!("Password check while protection is disabled");
        return Err(GateError::IncorrectPassword);
    }
    if !settings.verify_password(supplied) {
        return Err(GateError::IncorrectPassword);
    }
    issue(snapshot).ok_or(GateError::IncorrectPassword)
}

#[must_use]
pub fn check_cookie(snapshot: &Snapshot, presented: Option<&str>) -> bool {
    token::verify(&snapshot.settings, &snapshot.salt, presented)
}

/// Build `base_url#<capability>` when share access is on and a password is set.
///
/// # Errors
/// Returns [`GateError::Store`] if the random source fails.
pub fn shared_access_link(
    snapshot: &Snapshot,
    base_url: &Url,
    now: u64,
) -> Result<Option<String>, GateError> {
    let Some(capability) = share::mint(&snapshot.settings, &snapshot.salt, now)? else {
        return Ok(None);
    };
    let mut link = base_url.clone();
    link.set_fragment(Some(&capability));
    Ok(Some(link.to_string()))
}

/// Exchange a share capability for a regular access token.
///
/// # Errors
/// Returns [`GateError::InvalidToken`] for expired, forged or disabled links.
pub fn redeem_share(
    snapshot: &Snapshot,
    capability: &str,
    now: u64,
) -> Result<IssuedToken, GateError> {
    if !snapshot.settings.enabled {
        return Err(GateError::InvalidToken);
    }
    if !share::verify(&snapshot.settings, &snapshot.salt, capability, now) {
        return Err(GateError::InvalidToken);
    }
    issue(snapshot).ok_or(GateError::InvalidToken)
}

fn issue(snapshot: &Snapshot) -> Option<IssuedToken> {
    token::issue(&snapshot.settings, &snapshot.salt).map(|value| IssuedToken {
        value,
        max_age_seconds: snapshot.settings.cookie_max_age_seconds(),
    })
}

// Messages are operator configuration and may carry markup.
fn restricted_paragraph(snapshot: &Snapshot, ctx: &RequestContext) -> String {
    format!("<p>{}</p>", select_message(&snapshot.settings, ctx))
}

/// Store-backed entry point used by the HTTP layer.
#[derive(Clone)]
pub struct ProtectionGate {
    store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for ProtectionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionGate").finish_non_exhaustive()
    }
}

impl ProtectionGate {
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    /// # Errors
    /// Returns [`GateError::Store`] when the store fails.
    pub fn snapshot(&self) -> Result<Snapshot, GateError> {
        Snapshot::load(self.store.as_ref())
    }

    /// # Errors
    /// See [`check_password`]; store failures surface as [`GateError::Store`].
    #[instrument(skip_all)]
    pub fn check_password(&self, supplied: &SecretString) -> Result<IssuedToken, GateError> {
        check_password(&self.snapshot()?, supplied)
    }

    /// Store failures count as an invalid cookie.
    #[instrument(skip_all)]
    pub fn check_cookie(&self, presented: Option<&str>) -> bool {
        match self.snapshot() {
            Ok(snapshot) => check_cookie(&snapshot, presented),
            Err(err) => {
                tracing::error!("Failed to load settings for cookie check: {err:?}");
                false
            }
        }
    }

    /// # Errors
    /// See [`redeem_share`]; store failures surface as [`GateError::Store`].
    #[instrument(skip_all)]
    pub fn redeem_share(&self, capability: &str) -> Result<IssuedToken, GateError> {
        redeem_share(&self.snapshot()?, capability, unix_now())
    }

    /// # Errors
    /// See [`shared_access_link`].
    pub fn shared_access_link(&self, base_url: &Url) -> Result<Option<String>, GateError> {
        shared_access_link(&self.snapshot()?, base_url, unix_now())
    }
}
