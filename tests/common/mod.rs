#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use rateshelf::{
    AppState, app,
    config::Config,
    db::{DbPool, init_memory_pool},
    models::user::{RegisterDto, Role, User},
    services::accounts,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _dir: TempDir,
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let staging = dir.path().join("staging").display().to_string();
    let covers = dir.path().join("covers").display().to_string();

    let config = Config::from_lookup(move |key| match key {
        "ACCESS_TOKEN_SECRET" => Some("test-access-secret".into()),
        "REFRESH_TOKEN_SECRET" => Some("test-refresh-secret".into()),
        "COOKIE_SECURE" => Some("false".into()),
        "UPLOAD_TMP_DIR" => Some(staging.clone()),
        "COVERS_DIR" => Some(covers.clone()),
        _ => None,
    })
    .expect("test config");

    let db = init_memory_pool().await.expect("memory pool");
    let state = AppState::new(db, Arc::new(config))
        .await
        .expect("app state");

    TestApp {
        router: app(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub fn db(&self) -> &DbPool {
        &self.state.db_pool
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub async fn create_user(db: &DbPool, username: &str, role: Role) -> User {
    match role {
        Role::User => accounts::register(
            db,
            &RegisterDto {
                full_name: format!("{username} Reader"),
                email: format!("{username}@example.com"),
                username: username.into(),
                password: "password123".into(),
            },
        )
        .await
        .expect("register user"),
        Role::Admin => accounts::create_account(
            db,
            &format!("{username} Admin"),
            &format!("{username}@example.com"),
            username,
            "password123",
            Role::Admin,
        )
        .await
        .expect("create admin"),
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// `name=value` pairs from every Set-Cookie header.
pub fn set_cookies(response: &Response<Body>) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}
