use super::settings::CategoryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[default]
    Post,
    Page,
    Attachment,
    Other,
}

/// What the host knows about the current request. Built fresh per request.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RequestContext {
    pub is_front_page: bool,
    /// The post listing page when it is not also the front page.
    pub is_home_listing: bool,
    /// Informational only. Category gating applies to every resource that is
    /// not a listing, whatever its type.
    pub resource_type: ResourceType,
    #[schema(value_type = Vec<u64>)]
    pub category_ids: BTreeSet<CategoryId>,
    pub is_feed: bool,
    pub viewer_roles: Vec<String>,
    /// Filled from the `blog_access` cookie, never from the request body.
    #[serde(skip)]
    pub presented_cookie_token: Option<String>,
    /// Capability taken from a share link fragment.
    pub presented_share_capability: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn with_cookie_token(mut self, token: Option<String>) -> Self {
        self.presented_cookie_token = token;
        self
    }
}
