//! Signed, expiring capabilities carried in share-access link fragments.
//!
//! Format: `v1.<nonce>.<expires_at>.<mac>` with base64url nonce and mac and the
//! expiry in unix seconds. The mac covers the nonce, the expiry and the current
//! password hash, keyed by the site salt, so links die with a password change.

use super::{settings::Settings, token::SiteSalt};
use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::Mac;
use rand::{RngCore, rngs::OsRng};

const SHARE_CONTEXT: &[u8] = b"blogpass-share-v1";
const VERSION: &str = "v1";
const NONCE_LEN: usize = 16;

/// Mint a capability valid until `now + share_link_lifetime`.
///
/// Returns `Ok(None)` when protection or sharing is switched off, or no
/// password is set.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn mint(settings: &Settings, salt: &SiteSalt, now: u64) -> Result<Option<String>> {
    if !settings.enabled || !settings.share_access_enabled {
        return Ok(None);
    }
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .context("failed to generate share nonce")?;
    let expires_at = now.saturating_add(settings.share_link_lifetime_seconds());
    let Some(mac) = share_mac(settings, salt, &nonce, expires_at) else {
        return Ok(None);
    };
    Ok(Some(format!(
        "{VERSION}.{}.{expires_at}.{}",
        Base64UrlUnpadded::encode_string(&nonce),
        Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes()),
    )))
}

/// Check signature and expiry of a presented capability.
///
/// Capabilities whose expiry lies further out than the current lifetime
/// setting allows are rejected, so shortening the lifetime also shortens
/// links already handed out.
#[must_use]
pub fn verify(settings: &Settings, salt: &SiteSalt, capability: &str, now: u64) -> bool {
    if !settings.share_access_enabled {
        return false;
    }
    let Some(parsed) = parse(capability) else {
        return false;
    };
    if parsed.expires_at <= now {
        return false;
    }
    if parsed.expires_at > now.saturating_add(settings.share_link_lifetime_seconds()) {
        return false;
    }
    let Some(mac) = share_mac(settings, salt, &parsed.nonce, parsed.expires_at) else {
        return false;
    };
    mac.verify_slice(&parsed.mac).is_ok()
}

struct Parsed {
    nonce: Vec<u8>,
    expires_at: u64,
    mac: Vec<u8>,
}

fn parse(capability: &str) -> Option<Parsed> {
    let mut parts = capability.trim().trim_start_matches('#').split('.');
    let version = parts.next()?;
    let nonce = parts.next()?;
    let expires_at = parts.next()?;
    let mac = parts.next()?;
    if version != VERSION || parts.next().is_some() {
        return None;
    }
    let nonce = Base64UrlUnpadded::decode_vec(nonce).ok()?;
    if nonce.len() != NONCE_LEN {
        return None;
    }
    Some(Parsed {
        nonce,
        expires_at: expires_at.parse().ok()?,
        mac: Base64UrlUnpadded::decode_vec(mac).ok()?,
    })
}

fn share_mac(
    settings: &Settings,
    salt: &SiteSalt,
    nonce: &[u8],
    expires_at: u64,
) -> Option<super::token::HmacSha256> {
    let hash = settings
        .password_hash
        .as_deref()
        .filter(|hash| !hash.is_empty())?;
    let mut mac = salt.keyed()?;
    mac.update(SHARE_CONTEXT);
    mac.update(nonce);
    mac.update(&expires_at.to_be_bytes());
    mac.update(hash.as_bytes());
    Some(mac)
}
