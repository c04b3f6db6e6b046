//! Popup endpoints: password check, cookie check and share link redemption.
//!
//! Bodies are form encoded like the popup script sends them; responses are
//! `{ "success": bool, "message": string }`. Failures never say why beyond a
//! generic message.

use super::{
    GateState,
    cookie::{access_cookie, extract_access_token},
};
use crate::gate::{GateError, IssuedToken};
use axum::{
    Form, Json,
    extract::{Extension, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

const ACCESS_GRANTED: &str = "Access granted.";

#[derive(ToSchema, Deserialize)]
pub struct CheckPasswordRequest {
    password: Option<String>,
}

impl fmt::Debug for CheckPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckPasswordRequest")
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct CheckShareRequest {
    capability: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CheckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CookieStatus {
    pub success: bool,
}

#[utoipa::path(
    post,
    path = "/check_password",
    request_body(content = CheckPasswordRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password accepted, access cookie set", body = CheckResponse),
        (status = 400, description = "Missing password field", body = CheckResponse),
        (status = 401, description = "Password rejected", body = CheckResponse),
        (status = 500, description = "Settings unavailable", body = CheckResponse)
    ),
    tag = "gate"
)]
#[instrument(skip_all)]
pub async fn check_password(
    state: Extension<Arc<GateState>>,
    payload: Result<Form<CheckPasswordRequest>, FormRejection>,
) -> Response {
    let password = match payload {
        Ok(Form(CheckPasswordRequest {
            password: Some(password),
        })) => SecretString::from(password),
        Ok(_) => return failure(&GateError::MalformedRequest),
        Err(rejection) => {
            debug!("Rejected check_password body: {rejection}");
            return failure(&GateError::MalformedRequest);
        }
    };

    // Argon2 is CPU bound and the store does file I/O.
    match state
        .blocking(move |gate| gate.check_password(&password))
        .await
    {
        Ok(issued) => {
            info!("Password accepted");
            granted(&state, &issued)
        }
        Err(err) => failure(&err),
    }
}

#[utoipa::path(
    post,
    path = "/check_cookie",
    responses(
        (status = 200, description = "Whether the presented access cookie is valid", body = CookieStatus)
    ),
    tag = "gate"
)]
#[instrument(skip_all)]
pub async fn check_cookie(headers: HeaderMap, state: Extension<Arc<GateState>>) -> Response {
    let token = extract_access_token(&headers);
    let success = state
        .blocking(move |gate| Ok(gate.check_cookie(token.as_deref())))
        .await
        .unwrap_or(false);
    debug!(success, "Cookie checked");
    (StatusCode::OK, Json(CookieStatus { success })).into_response()
}

#[utoipa::path(
    post,
    path = "/check_share",
    request_body(content = CheckShareRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Share link accepted, access cookie set", body = CheckResponse),
        (status = 400, description = "Missing capability field", body = CheckResponse),
        (status = 401, description = "Share link expired or invalid", body = CheckResponse),
        (status = 500, description = "Settings unavailable", body = CheckResponse)
    ),
    tag = "gate"
)]
#[instrument(skip_all)]
pub async fn check_share(
    state: Extension<Arc<GateState>>,
    payload: Result<Form<CheckShareRequest>, FormRejection>,
) -> Response {
    let capability = match payload {
        Ok(Form(CheckShareRequest {
            capability: Some(capability),
        })) => capability,
        Ok(_) => return failure(&GateError::MalformedRequest),
        Err(rejection) => {
            debug!("Rejected check_share body: {rejection}");
            return failure(&GateError::MalformedRequest);
        }
    };

    match state
        .blocking(move |gate| gate.redeem_share(&capability))
        .await
    {
        Ok(issued) => {
            info!("Share link redeemed");
            granted(&state, &issued)
        }
        Err(err) => failure(&err),
    }
}

fn granted(state: &GateState, issued: &IssuedToken) -> Response {
    let body = Json(CheckResponse {
        success: true,
        message: ACCESS_GRANTED.to_string(),
    });
    match access_cookie(&issued.value, issued.max_age_seconds, state.cookie_secure()) {
        Ok(cookie) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (StatusCode::OK, headers, body).into_response()
        }
        Err(err) => {
            error!("Failed to build access cookie: {err}");
            failure(&GateError::Store("cookie encoding".to_string()))
        }
    }
}

fn failure(err: &GateError) -> Response {
    let status = match err {
        GateError::IncorrectPassword | GateError::InvalidToken => StatusCode::UNAUTHORIZED,
        GateError::MalformedRequest => StatusCode::BAD_REQUEST,
        GateError::ConfigurationMissing | GateError::Store(_) => {
            error!("Gate failure: {err:?}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = CheckResponse {
        success: false,
        message: err.public_message().to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gate::{MemorySettingsStore, ProtectionGate, Settings};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header::CONTENT_TYPE},
        routing::post,
    };
    use tower::ServiceExt;

    fn app(password: Option<&str>) -> Router {
        let mut settings = Settings::default();
        if let Some(password) = password {
            settings
                .set_password(&SecretString::from(password.to_string()))
                .unwrap();
        }
        let gate = ProtectionGate::new(Arc::new(MemorySettingsStore::with_settings(settings)));
        Router::new()
            .route("/check_password", post(check_password))
            .route("/check_cookie", post(check_cookie))
            .route("/check_share", post(check_share))
            .layer(Extension(Arc::new(GateState::new(gate, true))))
    }

    fn form(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn correct_password_sets_secure_cookie() {
        let response = app(Some("correct"))
            .oneshot(form("/check_password", "password=correct"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("blog_access="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.ends_with("; Secure"));

        let body: CheckResponse = json(response).await;
        assert!(body.success);
    }

    #[tokio::test]
    async fn wrong_password_sets_no_cookie() {
        let response = app(Some("correct"))
            .oneshot(form("/check_password", "password=wrong"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body: CheckResponse = json(response).await;
        assert_eq!(
            body,
            CheckResponse {
                success: false,
                message: "Incorrect password.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unset_password_is_indistinguishable_from_wrong() {
        let response = app(None)
            .oneshot(form("/check_password", "password=123qwerty"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: CheckResponse = json(response).await;
        assert_eq!(body.message, "Incorrect password.");
    }

    #[tokio::test]
    async fn empty_password_is_incorrect_not_malformed() {
        let response = app(Some("correct"))
            .oneshot(form("/check_password", "password="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_password_field_is_malformed() {
        let response = app(Some("correct"))
            .oneshot(form("/check_password", "action=check_password"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: CheckResponse = json(response).await;
        assert!(!body.success);
    }

    #[tokio::test]
    async fn check_cookie_without_cookie_fails() {
        let response = app(Some("correct"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/check_cookie")
                    .header("cookie", "blog_access=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: CookieStatus = json(response).await;
        assert!(!body.success);
    }

    #[tokio::test]
    async fn garbage_share_capability_is_rejected() {
        let response = app(Some("correct"))
            .oneshot(form("/check_share", "capability=mySecretSalt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
