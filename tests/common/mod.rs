#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;

use hashlink::application::services::{ShortenerService, UserTokenSigner};
use hashlink::domain::repositories::{UrlRepository, UserRepository};
use hashlink::infrastructure::persistence::{MemoryUrlRepository, MemoryUserRepository};
use hashlink::routes::app_router;
use hashlink::state::AppState;

pub const BASE_URL: &str = "http://localhost:8080/";
pub const SECRET: &str = "test-signing-secret";

pub fn service_with(
    urls: Arc<dyn UrlRepository>,
    users: Arc<dyn UserRepository>,
) -> Arc<ShortenerService> {
    Arc::new(ShortenerService::new(
        urls,
        users,
        UserTokenSigner::new(SECRET).unwrap(),
        BASE_URL,
        Duration::from_secs(2),
    ))
}

pub fn create_test_state() -> AppState {
    AppState::new(service_with(
        Arc::new(MemoryUrlRepository::new()),
        Arc::new(MemoryUserRepository::new()),
    ))
}

pub fn create_test_server() -> TestServer {
    TestServer::new(app_router(create_test_state())).unwrap()
}

/// Extracts the `auth=<token>` pair from a `Set-Cookie` value.
pub fn auth_cookie(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap()
        .trim()
        .to_string()
}
