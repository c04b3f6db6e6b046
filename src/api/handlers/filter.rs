//! Content filter endpoint for host rendering pipelines.

use super::{GateState, cookie::extract_access_token};
use crate::gate::{self, PopupView, ProtectionGate, RequestContext, Verdict};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct FilterRequest {
    #[serde(default)]
    context: RequestContext,
    content: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct FilterResponse {
    pub verdict: Verdict,
    /// Original content on `pass`, the restricted message otherwise.
    pub content: String,
    /// Present only when the popup should be shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupView>,
}

#[utoipa::path(
    post,
    path = "/v1/filter",
    request_body = FilterRequest,
    responses(
        (status = 200, description = "Filtered content", body = FilterResponse),
        (status = 400, description = "Malformed request body"),
        (status = 503, description = "Settings unavailable; content withheld")
    ),
    tag = "gate"
)]
#[instrument(skip_all)]
pub async fn filter(
    headers: HeaderMap,
    state: Extension<Arc<GateState>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected filter body: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Malformed request." })),
            )
                .into_response();
        }
    };

    // Never hand back the raw content without a readable configuration.
    let snapshot = match state.blocking(ProtectionGate::snapshot).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("Failed to load settings for filter: {err:?}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "Service unavailable." })),
            )
                .into_response();
        }
    };

    let ctx = request
        .context
        .with_cookie_token(extract_access_token(&headers));
    let now = gate::unix_now();
    let verdict = gate::evaluate_at(&snapshot, &ctx, now);
    debug!(?verdict, resource_type = ?ctx.resource_type, "Filter evaluated");

    let response = FilterResponse {
        verdict,
        content: gate::filter_content_at(&snapshot, &ctx, &request.content, now),
        popup: (verdict == Verdict::Challenge).then(|| gate::popup(&snapshot.settings)),
    };
    (StatusCode::OK, Json(response)).into_response()
}
