use super::GateState;
use crate::gate::ProtectionGate;
use crate::GIT_COMMIT_HASH;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    settings: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Settings store is readable", body = Health),
        (status = 503, description = "Settings store is unreadable", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(state: Extension<Arc<GateState>>) -> impl IntoResponse {
    let result = state.blocking(ProtectionGate::snapshot).await;
    if let Err(err) = &result {
        error!("Settings store check failed: {err:?}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        settings: if result.is_ok() { "ok" } else { "error" }.to_string(),
    };

    let short_hash = if health.commit.len() > 7 {
        health.commit.get(0..7).unwrap_or("")
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}
