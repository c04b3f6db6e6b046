//! Whether a request needs the password challenge.
//!
//! Rules are evaluated in a fixed order and the first match wins: the global
//! switch, then role exemptions, then the front page, the blog listing, and
//! finally category membership of single items. Listings never fall through
//! to the category rule so excerpts are not filtered twice.

use super::{context::RequestContext, settings::Settings};
use serde::Serialize;
use utoipa::ToSchema;

#[must_use]
pub fn requires_challenge(settings: &Settings, ctx: &RequestContext) -> bool {
    if !settings.enabled {
        return false;
    }

    if viewer_is_exempt(settings, ctx) {
        return false;
    }

    if settings.home_page_protected && ctx.is_front_page {
        return true;
    }

    if settings.blog_page_protected && ctx.is_home_listing {
        return true;
    }

    !ctx.is_home_listing
        && ctx
            .category_ids
            .iter()
            .any(|id| settings.protected_category_ids.contains(id))
}

/// Message that replaces protected content.
#[must_use]
pub fn select_message<'a>(settings: &'a Settings, ctx: &RequestContext) -> &'a str {
    if ctx.is_feed {
        &settings.restricted_message_feeds
    } else {
        &settings.restricted_message
    }
}

/// Popup copy handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PopupView {
    pub title: String,
    pub error_message: String,
    pub return_link_url: String,
    pub return_link_text: String,
}

#[must_use]
pub fn popup(settings: &Settings) -> PopupView {
    PopupView {
        title: settings.popup_title.clone(),
        error_message: settings.error_message.clone(),
        return_link_url: settings.return_link_url.clone(),
        return_link_text: settings.return_link_text.clone(),
    }
}

// Stored roles are already lowercase after `Settings::normalized`, but the
// comparison folds both sides so raw records behave the same.
fn viewer_is_exempt(settings: &Settings, ctx: &RequestContext) -> bool {
    if settings.exempt_roles.is_empty() {
        return false;
    }
    ctx.viewer_roles.iter().any(|role| {
        let role = role.trim().to_lowercase();
        settings
            .exempt_roles
            .iter()
            .any(|exempt| exempt.to_lowercase() == role)
    })
}
