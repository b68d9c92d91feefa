use axum::http::{Method, StatusCode};

use crate::integration::common::{request, send, setup_offline_app};

#[tokio::test]
async fn missing_token_returns_401_envelope() {
    let app = setup_offline_app();

    let (status, json) = send(&app.router, request(Method::GET, "/api/v1/private/me", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], "error");
    assert!(json["data"].is_null());
    assert!(json["message"].as_str().unwrap().contains("Authorization"));
}

#[tokio::test]
async fn garbage_token_returns_401() {
    let app = setup_offline_app();

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/cart", Some("not.a.jwt"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn admin_route_without_token_returns_401() {
    let app = setup_offline_app();

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/products", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_login_body_returns_400() {
    let app = setup_offline_app();

    let (status, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/public/auth/login",
            None,
            Some(serde_json::json!({"email": "ada@example.com"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn non_numeric_id_returns_400() {
    let app = setup_offline_app();

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/public/products/abc", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_offline_app();

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api-docs/openapi.json", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["title"], "Bazaar API");
    assert!(json["paths"]["/api/v1/private/cart/checkout"].is_object());
}
