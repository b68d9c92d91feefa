use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use crate::integration::common::{admin_token, register_and_login, request, send, setup_test_app};

fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn health_reports_database_ok() {
    let app = setup_test_app().await;

    let (status, json) = send(&app.router, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["database"], "ok");
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn register_login_and_me() {
    let app = setup_test_app().await;
    let (token, id) = register_and_login(&app, "ada@example.com").await;

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/me", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["roles"], json!(["USER"]));
    assert!(json["data"].get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn duplicate_registration_returns_409() {
    let app = setup_test_app().await;
    register_and_login(&app, "ada@example.com").await;

    let body = json!({
        "email": "ada@example.com",
        "password": "another-password",
        "full_name": "Ada Again",
    });
    let (status, _) = send(
        &app.router,
        request(Method::POST, "/api/v1/public/auth/register", None, Some(body)),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn wrong_password_returns_401() {
    let app = setup_test_app().await;
    register_and_login(&app, "ada@example.com").await;

    let body = json!({"email": "ada@example.com", "password": "wrong-password"});
    let (status, _) = send(
        &app.router,
        request(Method::POST, "/api/v1/public/auth/login", None, Some(body)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn customer_cannot_reach_admin_routes() {
    let app = setup_test_app().await;
    let (token, _) = register_and_login(&app, "ada@example.com").await;

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/coupons", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn admin_crud_round_trip() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    let (status, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/products",
            Some(&token),
            Some(json!({"name": "Mug", "sku": "MUG-1", "price": "12.50"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = send(
        &app.router,
        request(
            Method::PUT,
            &format!("/api/v1/private/products/{id}"),
            Some(&token),
            Some(json!({"price": "15.00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Mug");
    assert_eq!(decimal(&json["data"]["price"]), Decimal::new(1500, 2));

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/public/products/search?q=mug", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);

    let (status, _) = send(
        &app.router,
        request(Method::DELETE, &format!("/api/v1/private/products/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        request(Method::GET, &format!("/api/v1/public/products/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn search_on_unsearchable_resource_returns_501() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/payments/search?q=x", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn cart_checkout_with_coupon() {
    let app = setup_test_app().await;
    let admin = admin_token(&app).await;

    let (_, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/products",
            Some(&admin),
            Some(json!({"name": "Lamp", "sku": "LAMP-1", "price": "15.00"})),
        ),
    )
    .await;
    let product_id = json["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/coupons",
            Some(&admin),
            Some(json!({"code": "TENOFF", "discount_type": "percentage", "discount_value": "10"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (token, user_id) = register_and_login(&app, "shopper@example.com").await;

    for quantity in [2, 1] {
        let (status, _) = send(
            &app.router,
            request(
                Method::POST,
                "/api/v1/private/cart/items",
                Some(&token),
                Some(json!({"product_id": product_id, "quantity": quantity})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/cart/coupon",
            Some(&token),
            Some(json!({"code": "TENOFF"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"][0]["quantity"], 3);
    assert_eq!(decimal(&json["data"]["total"]), Decimal::new(4050, 2));

    let (status, json) = send(
        &app.router,
        request(Method::POST, "/api/v1/private/cart/checkout", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["data"]["order"]["user_id"], user_id);
    assert_eq!(json["data"]["order"]["status"], "pending");
    assert_eq!(decimal(&json["data"]["order"]["discount"]), Decimal::new(450, 2));
    assert_eq!(json["data"]["details"].as_array().unwrap().len(), 1);
    let order_id = json["data"]["order"]["id"].as_i64().unwrap();

    let (status, json) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/me/orders", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);

    let (status, json) = send(
        &app.router,
        request(
            Method::POST,
            &format!("/api/v1/private/me/orders/{order_id}/cancel"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["order"]["status"], "cancelled");

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/cart", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn other_users_order_is_not_found() {
    let app = setup_test_app().await;
    let (token, _) = register_and_login(&app, "ada@example.com").await;

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/v1/private/me/orders/999", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn upload_product_image_stores_file() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    let (_, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/products",
            Some(&token),
            Some(json!({"name": "Vase", "sku": "VASE-1", "price": "30.00"})),
        ),
    )
    .await;
    let product_id = json["data"]["id"].as_i64().unwrap();

    let boundary = "bazaar-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"vase.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );
    let upload = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/private/products/{product_id}/images"))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&app.router, upload).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");

    let url = json["data"][0]["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/products/"));
    assert!(url.ends_with(".png"));
    assert_eq!(json["data"][0]["alt_text"], "vase.png");

    let stored = app.uploads.path().join(url.trim_start_matches("/uploads/"));
    assert_eq!(std::fs::read(stored).unwrap(), b"not-really-a-png");

    let (status, _) = send(&app.router, request(Method::GET, url, None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn upload_with_a_bad_part_stores_nothing() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    let (_, json) = send(
        &app.router,
        request(
            Method::POST,
            "/api/v1/private/products",
            Some(&token),
            Some(json!({"name": "Lamp", "sku": "LAMP-1", "price": "45.00"})),
        ),
    )
    .await;
    let product_id = json["data"]["id"].as_i64().unwrap();

    let boundary = "bazaar-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"lamp.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         first-image\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         not an image\r\n\
         --{boundary}--\r\n"
    );
    let upload = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/private/products/{product_id}/images"))
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(&app.router, upload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");

    let images = app.db.product_images().for_product(product_id).await.unwrap();
    assert!(images.is_empty());

    let dir = app.uploads.path().join("products");
    let leftovers = std::fs::read_dir(&dir).map(|entries| entries.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}
