//! Access token derivation and verification.
//!
//! The token is `HMAC-SHA256(site_salt, context || password_hash)`. The server
//! keeps no session table: a presented token is checked by recomputing it from
//! the current settings, so a password change invalidates every cookie already
//! handed out.

use super::settings::Settings;
use anyhow::{Context, Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use std::fmt;

pub(super) type HmacSha256 = Hmac<Sha256>;

const ACCESS_CONTEXT: &[u8] = b"blogpass-access-v1";
pub const SITE_SALT_LEN: usize = 32;
pub const MIN_SITE_SALT_LEN: usize = 16;

/// Random per-installation key mixed into every token.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteSalt(Vec<u8>);

impl SiteSalt {
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = vec![0u8; SITE_SALT_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate site salt")?;
        Ok(Self(bytes))
    }

    /// # Errors
    /// Returns an error when the salt is shorter than [`MIN_SITE_SALT_LEN`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_SITE_SALT_LEN {
            return Err(anyhow!(
                "site salt must be at least {MIN_SITE_SALT_LEN} bytes, got {}",
                bytes.len()
            ));
        }
        Ok(Self(bytes))
    }

    /// # Errors
    /// Returns an error for invalid base64 or a too short salt.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let bytes = Base64UrlUnpadded::decode_vec(encoded.trim())
            .map_err(|_| anyhow!("site salt is not valid base64url"))?;
        Self::from_bytes(bytes)
    }

    #[must_use]
    pub fn encode(&self) -> String {
        Base64UrlUnpadded::encode_string(&self.0)
    }

    pub(super) fn keyed(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.0).ok()
    }
}

impl fmt::Debug for SiteSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SiteSalt(***)")
    }
}

/// Derive the current access token, or `None` while no password is set.
#[must_use]
pub fn issue(settings: &Settings, salt: &SiteSalt) -> Option<String> {
    let mac = access_mac(settings, salt)?;
    Some(Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes()))
}

/// Constant-time check of a presented token against the current settings.
#[must_use]
pub fn verify(settings: &Settings, salt: &SiteSalt, presented: Option<&str>) -> bool {
    let Some(presented) = presented.map(str::trim).filter(|token| !token.is_empty()) else {
        return false;
    };
    let Ok(presented) = Base64UrlUnpadded::decode_vec(presented) else {
        return false;
    };
    let Some(mac) = access_mac(settings, salt) else {
        return false;
    };
    mac.verify_slice(&presented).is_ok()
}

fn access_mac(settings: &Settings, salt: &SiteSalt) -> Option<HmacSha256> {
    let hash = settings
        .password_hash
        .as_deref()
        .filter(|hash| !hash.is_empty())?;
    let mut mac = salt.keyed()?;
    mac.update(ACCESS_CONTEXT);
    mac.update(hash.as_bytes());
    Some(mac)
}
