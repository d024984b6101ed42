mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

/// Shortens `url` as the caller holding `cookie` and returns the caller's
/// cookie pair, issued fresh when none was sent.
async fn shorten_as(server: &TestServer, cookie: Option<&str>, url: &str) -> String {
    let mut request = server.post("/").text(url.to_string());
    if let Some(cookie) = cookie {
        request = request.add_header("cookie", cookie.to_string());
    }
    let response = request.await;

    match response.headers().get("set-cookie") {
        Some(value) => common::auth_cookie(value.to_str().unwrap()),
        None => cookie.unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_fresh_caller_has_no_urls() {
    let server = common::create_test_server();

    server
        .get("/api/user/urls")
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_user_urls_lists_in_creation_order() {
    let server = common::create_test_server();

    let cookie = shorten_as(&server, None, "https://example.com/b").await;
    shorten_as(&server, Some(&cookie), "https://example.com/a").await;
    // Repeating a URL does not list it twice.
    shorten_as(&server, Some(&cookie), "https://example.com/b").await;

    let response = server
        .get("/api/user/urls")
        .add_header("cookie", cookie.clone())
        .await;

    response.assert_status_ok();
    assert!(response.headers().get("set-cookie").is_none());
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!([
            { "short_url": "http://localhost:8080/69a42", "original_url": "https://example.com/b" },
            { "short_url": "http://localhost:8080/c4ed1", "original_url": "https://example.com/a" }
        ])
    );
}

#[tokio::test]
async fn test_users_do_not_see_each_other() {
    let server = common::create_test_server();

    shorten_as(&server, None, "https://example.com/a").await;
    let other = shorten_as(&server, None, "https://example.com/b").await;

    let response = server
        .get("/api/user/urls")
        .add_header("cookie", other)
        .await;

    let body = response.json::<serde_json::Value>();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["original_url"], "https://example.com/b");
}

#[tokio::test]
async fn test_forged_cookie_is_replaced() {
    let server = common::create_test_server();

    let response = server
        .get("/api/user/urls")
        .add_header("cookie", format!("auth={}", "00".repeat(40)))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
    let set_cookie = response.headers().get("set-cookie").unwrap();
    assert!(set_cookie.to_str().unwrap().starts_with("auth="));
}

#[tokio::test]
async fn test_delete_on_memory_backend_is_not_implemented() {
    let server = common::create_test_server();
    let cookie = shorten_as(&server, None, "https://example.com/a").await;

    server
        .delete("/api/user/urls")
        .add_header("cookie", cookie)
        .json(&json!(["c4ed1"]))
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_user_urls_response_is_gzip_when_accepted() {
    let server = common::create_test_server();
    let cookie = shorten_as(&server, None, "https://example.com/a").await;
    shorten_as(&server, Some(&cookie), "https://example.com/b").await;

    let response = server
        .get("/api/user/urls")
        .add_header("cookie", cookie)
        .add_header("accept-encoding", "gzip")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-encoding"), "gzip");
}
