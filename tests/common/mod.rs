//! Router harness shared by the test binaries
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use sqlx::PgPool;

use shelfmark::{
    api,
    repository::Repository,
    services::{sessions::MemoryRevocationStore, Services},
    AppConfig, AppState,
};

pub fn state_with_pool(pool: PgPool) -> AppState {
    let config = AppConfig::default();
    let services = Services::new(
        Repository::new(pool),
        config.auth.clone(),
        Arc::new(MemoryRevocationStore::new()),
    )
    .expect("services");

    AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    }
}

pub fn app(state: &AppState) -> Router {
    api::create_router(state.clone())
}

/// `application/x-www-form-urlencoded` body
pub fn form(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
}

pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}
