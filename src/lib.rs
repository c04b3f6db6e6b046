//! # Blogpass (shared-password gate for blog content)
//!
//! `blogpass` protects posts and pages behind a single shared password. A
//! visitor who enters the password receives a signed `blog_access` cookie;
//! later requests present the cookie and the gate decides whether content is
//! shown, replaced by a message, or challenged with the password popup.
//!
//! ## Decision order
//!
//! The gate checks, in this order: the global switch, exempt viewer roles
//! (case-insensitive), the front page, the blog listing page, and finally the
//! categories of single posts and pages. The first matching rule wins.
//!
//! ## Tokens
//!
//! - **Password:** stored only as an Argon2id hash.
//! - **Access token:** `HMAC-SHA256(site_salt, password_hash)`. Nothing is
//!   stored per visitor; changing the password invalidates every cookie.
//! - **Share links:** carry a signed, expiring capability in the URL fragment
//!   instead of the password.

pub mod api;
pub mod cli;
pub mod gate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
