//! Typed settings record written by the admin surface and read by the gate.
//!
//! Every field has a default so partially written records (older versions,
//! hand-edited files) still load. Call [`Settings::normalized`] after loading
//! to fold role names and repair zero lifetimes.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_COOKIE_LIFETIME_HOURS: u32 = 24;
pub const DEFAULT_SHARE_LINK_LIFETIME_HOURS: u32 = 7 * 24;
pub const DEFAULT_RESTRICTED_MESSAGE: &str =
    "This content is password protected. Please enter the password below to access it.";
pub const DEFAULT_ERROR_MESSAGE: &str = "Incorrect password. Try again.";
pub const DEFAULT_POPUP_TITLE: &str = "Enter Password to Access the Blog";
pub const DEFAULT_RETURN_LINK_URL: &str = "/";
pub const DEFAULT_RETURN_LINK_TEXT: &str = "Return to the main page";

pub type CategoryId = u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    /// Argon2id PHC string. `None` until an operator sets a password.
    pub password_hash: Option<String>,
    pub cookie_lifetime_hours: u32,
    pub share_access_enabled: bool,
    pub share_link_lifetime_hours: u32,
    pub protected_category_ids: BTreeSet<CategoryId>,
    pub exempt_roles: BTreeSet<String>,
    pub blog_page_protected: bool,
    pub home_page_protected: bool,
    pub restricted_message: String,
    pub restricted_message_feeds: String,
    pub error_message: String,
    pub popup_title: String,
    pub return_link_url: String,
    pub return_link_text: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            password_hash: None,
            cookie_lifetime_hours: DEFAULT_COOKIE_LIFETIME_HOURS,
            share_access_enabled: true,
            share_link_lifetime_hours: DEFAULT_SHARE_LINK_LIFETIME_HOURS,
            protected_category_ids: BTreeSet::new(),
            exempt_roles: BTreeSet::new(),
            blog_page_protected: true,
            home_page_protected: false,
            restricted_message: DEFAULT_RESTRICTED_MESSAGE.to_string(),
            restricted_message_feeds: DEFAULT_RESTRICTED_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            popup_title: DEFAULT_POPUP_TITLE.to_string(),
            return_link_url: DEFAULT_RETURN_LINK_URL.to_string(),
            return_link_text: DEFAULT_RETURN_LINK_TEXT.to_string(),
        }
    }
}

impl Settings {
    /// Lowercase and trim exempt roles, drop empty ones, repair zero lifetimes.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.exempt_roles = self
            .exempt_roles
            .iter()
            .map(|role| role.trim().to_lowercase())
            .filter(|role| !role.is_empty())
            .collect();
        if self.cookie_lifetime_hours == 0 {
            self.cookie_lifetime_hours = DEFAULT_COOKIE_LIFETIME_HOURS;
        }
        if self.share_link_lifetime_hours == 0 {
            self.share_link_lifetime_hours = DEFAULT_SHARE_LINK_LIFETIME_HOURS;
        }
        self
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|hash| !hash.is_empty())
    }

    #[must_use]
    pub fn cookie_max_age_seconds(&self) -> u64 {
        u64::from(self.cookie_lifetime_hours) * 60 * 60
    }

    #[must_use]
    pub fn share_link_lifetime_seconds(&self) -> u64 {
        u64::from(self.share_link_lifetime_hours) * 60 * 60
    }

    /// Replace the stored hash with an Argon2id hash of `password`.
    ///
    /// Changing the hash rotates every issued access token and share link.
    ///
    /// # Errors
    /// Returns an error for an empty password or if hashing fails.
    pub fn set_password(&mut self, password: &SecretString) -> Result<()> {
        let plain = password.expose_secret();
        if plain.is_empty() {
            return Err(anyhow!("password must not be empty"));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|_| anyhow!("failed to hash password"))?
            .to_string();
        self.password_hash = Some(hash);
        Ok(())
    }

    /// Check a supplied password against the stored hash.
    ///
    /// Missing hash, empty input and unparsable hashes all yield `false`.
    #[must_use]
    pub fn verify_password(&self, supplied: &SecretString) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };
        let plain = supplied.expose_secret();
        if plain.is_empty() {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Partial change to [`Settings`]; `None` keeps the stored value.
///
/// The password is changed through [`Settings::set_password`] only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub enabled: Option<bool>,
    pub cookie_lifetime_hours: Option<u32>,
    pub share_access_enabled: Option<bool>,
    pub share_link_lifetime_hours: Option<u32>,
    pub protected_category_ids: Option<BTreeSet<CategoryId>>,
    pub exempt_roles: Option<BTreeSet<String>>,
    pub blog_page_protected: Option<bool>,
    pub home_page_protected: Option<bool>,
    pub restricted_message: Option<String>,
    pub restricted_message_feeds: Option<String>,
    pub error_message: Option<String>,
    pub popup_title: Option<String>,
    pub return_link_url: Option<String>,
    pub return_link_text: Option<String>,
}

impl SettingsUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn apply(self, mut settings: Settings) -> Settings {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut settings.enabled, self.enabled);
        set(&mut settings.cookie_lifetime_hours, self.cookie_lifetime_hours);
        set(&mut settings.share_access_enabled, self.share_access_enabled);
        set(
            &mut settings.share_link_lifetime_hours,
            self.share_link_lifetime_hours,
        );
        set(
            &mut settings.protected_category_ids,
            self.protected_category_ids,
        );
        set(&mut settings.exempt_roles, self.exempt_roles);
        set(&mut settings.blog_page_protected, self.blog_page_protected);
        set(&mut settings.home_page_protected, self.home_page_protected);
        set(&mut settings.restricted_message, self.restricted_message);
        set(
            &mut settings.restricted_message_feeds,
            self.restricted_message_feeds,
        );
        set(&mut settings.error_message, self.error_message);
        set(&mut settings.popup_title, self.popup_title);
        set(&mut settings.return_link_url, self.return_link_url);
        set(&mut settings.return_link_text, self.return_link_text);
        settings.normalized()
    }
}
