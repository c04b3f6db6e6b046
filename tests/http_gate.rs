#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use blogpass::{
    api::{self, handlers::GateState},
    gate::{FileSettingsStore, ProtectionGate, Settings, SettingsStore},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

const PROTECTED_CATEGORY: u64 = 7;

struct Harness {
    _dir: TempDir,
    store: Arc<FileSettingsStore>,
    app: Router,
}

impl Harness {
    fn new(password: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSettingsStore::new(dir.path().join("settings.json")));

        let mut settings = Settings::default();
        settings.protected_category_ids.insert(PROTECTED_CATEGORY);
        settings
            .set_password(&SecretString::from(password.to_string()))
            .unwrap();
        store.put(&settings).unwrap();

        let gate = ProtectionGate::new(store.clone());
        let app = api::router(Arc::new(GateState::new(gate, true)));
        Self {
            _dir: dir,
            store,
            app,
        }
    }

    fn gate(&self) -> ProtectionGate {
        ProtectionGate::new(self.store.clone())
    }

    fn rotate_password(&self, password: &str) {
        let mut settings = self.store.get().unwrap().unwrap();
        settings
            .set_password(&SecretString::from(password.to_string()))
            .unwrap();
        self.store.put(&settings).unwrap();
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, cookie, body)
    }

    async fn check_password(&self, password: &str) -> (StatusCode, Option<String>, Value) {
        self.send(form("/check_password", format!("password={password}")))
            .await
    }

    async fn check_cookie(&self, cookie: &str) -> bool {
        let request = Request::builder()
            .method("POST")
            .uri("/check_cookie")
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        body["success"].as_bool().unwrap()
    }

    async fn filter(&self, cookie: Option<&str>, context: Value) -> Value {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/filter")
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let body = json!({ "context": context, "content": "<p>members only</p>" });
        let (status, _, body) = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

fn form(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// `blog_access=<token>` from a `Set-Cookie` value.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

fn protected_post() -> Value {
    json!({ "resource_type": "post", "category_ids": [PROTECTED_CATEGORY] })
}

#[tokio::test]
async fn visitor_unlocks_protected_post_with_password() {
    let harness = Harness::new("correct horse");

    let challenged = harness.filter(None, protected_post()).await;
    assert_eq!(challenged["verdict"], "challenge");
    assert_ne!(challenged["content"], "<p>members only</p>");
    assert_eq!(
        challenged["popup"]["title"],
        "Enter Password to Access the Blog"
    );

    let (status, cookie, body) = harness.check_password("wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Incorrect password.");

    let (status, cookie, body) = harness.check_password("correct%20horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let set_cookie = cookie.unwrap();
    assert!(set_cookie.starts_with("blog_access="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let cookie = cookie_pair(&set_cookie);
    assert!(harness.check_cookie(&cookie).await);

    let unlocked = harness.filter(Some(&cookie), protected_post()).await;
    assert_eq!(unlocked["verdict"], "pass");
    assert_eq!(unlocked["content"], "<p>members only</p>");
    assert!(unlocked.get("popup").is_none());
}

#[tokio::test]
async fn unprotected_content_passes_without_cookie() {
    let harness = Harness::new("pw");
    let body = harness
        .filter(None, json!({ "resource_type": "post", "category_ids": [1, 2] }))
        .await;
    assert_eq!(body["verdict"], "pass");
    assert_eq!(body["content"], "<p>members only</p>");
}

#[tokio::test]
async fn feeds_get_the_feed_message() {
    let harness = Harness::new("pw");
    let mut context = protected_post();
    context["is_feed"] = json!(true);
    let body = harness.filter(None, context).await;
    assert_eq!(body["verdict"], "replace_with_message");
    assert!(body.get("popup").is_none());
}

#[tokio::test]
async fn password_change_revokes_existing_cookies() {
    let harness = Harness::new("first");
    let (_, cookie, _) = harness.check_password("first").await;
    let cookie = cookie_pair(&cookie.unwrap());
    assert!(harness.check_cookie(&cookie).await);

    harness.rotate_password("second");

    assert!(!harness.check_cookie(&cookie).await);
    let body = harness.filter(Some(&cookie), protected_post()).await;
    assert_eq!(body["verdict"], "challenge");
}

#[tokio::test]
async fn share_link_grants_access_until_password_changes() {
    let harness = Harness::new("pw");
    let link = harness
        .gate()
        .shared_access_link(&Url::parse("https://blog.example.com/private/").unwrap())
        .unwrap()
        .unwrap();
    let link = Url::parse(&link).unwrap();
    let capability = link.fragment().unwrap().to_string();

    let mut context = protected_post();
    context["presented_share_capability"] = json!(capability);
    let body = harness.filter(None, context.clone()).await;
    assert_eq!(body["verdict"], "pass");

    let (status, cookie, body) = harness
        .send(form("/check_share", format!("capability={capability}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(harness.check_cookie(&cookie_pair(&cookie.unwrap())).await);

    harness.rotate_password("rotated");

    let body = harness.filter(None, context).await;
    assert_eq!(body["verdict"], "challenge");
    let (status, cookie, _) = harness
        .send(form("/check_share", format!("capability={capability}")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
}

#[tokio::test]
async fn health_and_openapi_are_served_with_request_ids() {
    let harness = Harness::new("pw");

    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (status, _, doc) = harness
        .send(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/v1/filter"].is_object());
}
