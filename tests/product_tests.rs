//! End-to-end tests for the product catalog.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use mercato::api::AppState;
use mercato::config::Config;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<AppState>, Router) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = mercato::api::create_app_state_from_config(config)
        .await
        .expect("failed to create app state");

    let router = mercato::api::router(state.clone());
    (state, router)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Token {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, json)
}

/// Registers the account and returns its token.
async fn signup(app: &Router, email: &str, is_seller: bool) -> String {
    let (status, _) = request(
        app,
        "POST",
        "/api/accounts/",
        None,
        Some(json!({
            "email": email,
            "password": "s3cret-pass",
            "first_name": "Test",
            "last_name": "User",
            "is_seller": is_seller,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        app,
        "POST",
        "/api/login/",
        None,
        Some(json!({ "email": email, "password": "s3cret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token").to_string()
}

async fn create_product(app: &Router, token: &str, description: &str, price: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/api/products/",
        Some(token),
        Some(json!({ "description": description, "price": price, "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn sellers_create_products_with_server_assigned_ownership() {
    let (_, app) = spawn_app().await;

    let token = signup(&app, "seller@mail.com", true).await;
    let body = create_product(&app, &token, "Mountain bike", "2500.00").await;

    assert!(body["id"].is_i64());
    assert_eq!(body["description"], json!("Mountain bike"));
    assert_eq!(body["price"], json!("2500.00"));
    assert_eq!(body["quantity"], json!(5));
    assert_eq!(body["is_active"], json!(true));

    // The nested seller uses the account wire form: no id, no password.
    assert_eq!(body["seller"]["email"], json!("seller@mail.com"));
    assert!(body["seller"].get("id").is_none());
    assert!(body["seller"].get("password").is_none());
}

#[tokio::test]
async fn prices_normalize_to_two_decimal_places() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "seller@mail.com", true).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&token),
        Some(json!({ "description": "Bell", "price": 19.5, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price"], json!("19.50"));

    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&token),
        Some(json!({ "description": "Frame", "price": "120", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["price"], json!("120.00"));
}

#[tokio::test]
async fn product_creation_requires_a_seller_account() {
    let (_, app) = spawn_app().await;

    let payload = json!({ "description": "Bike", "price": "100.00", "quantity": 1 });

    // No credentials.
    let (status, body) = request(&app, "POST", "/api/products/", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        json!("Authentication credentials were not provided.")
    );

    // Authenticated, but not a seller.
    let buyer_token = signup(&app, "buyer@mail.com", false).await;
    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&buyer_token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        json!("You do not have permission to perform this action.")
    );
}

#[tokio::test]
async fn product_validation_reports_every_field() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "seller@mail.com", true).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&token),
        Some(json!({ "price": "12.345", "quantity": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], json!(["This field is required."]));
    assert_eq!(
        body["price"],
        json!(["Ensure that there are no more than 2 decimal places."])
    );
    assert_eq!(
        body["quantity"],
        json!(["Ensure this value is greater than or equal to 1."])
    );
}

#[tokio::test]
async fn price_digit_budget_is_enforced() {
    let (_, app) = spawn_app().await;
    let token = signup(&app, "seller@mail.com", true).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&token),
        Some(json!({ "description": "Yacht", "price": "12345678901.99", "quantity": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["price"],
        json!(["Ensure that there are no more than 12 digits in total."])
    );

    let (status, body) = request(
        &app,
        "POST",
        "/api/products/",
        Some(&token),
        Some(json!({ "description": "Yacht", "price": "a lot", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["price"], json!(["A valid number is required."]));
}

#[tokio::test]
async fn catalog_listing_and_detail_are_public() {
    let (_, app) = spawn_app().await;

    let token = signup(&app, "seller@mail.com", true).await;
    create_product(&app, &token, "Mountain bike", "2500.00").await;
    let second = create_product(&app, &token, "City bike", "900.00").await;

    let (status, body) = request(&app, "GET", "/api/products/", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().expect("plain array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["description"], json!("Mountain bike"));
    assert_eq!(rows[1]["description"], json!("City bike"));

    // Listing rows are flat: seller id only, no embedded account.
    assert!(rows[0]["seller_id"].is_i64());
    assert!(rows[0].get("seller").is_none());
    assert!(rows[0].get("id").is_none());

    let second_id = second["id"].as_i64().unwrap();
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/products/{second_id}/"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("City bike"));
    assert_eq!(body["price"], json!("900.00"));
    assert!(body["seller_id"].is_i64());
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let (_, app) = spawn_app().await;

    let (status, body) = request(&app, "GET", "/api/products/999/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], json!("Not found."));

    // Same for updates, even from an authenticated seller: the 404 wins
    // before any ownership question comes up.
    let token = signup(&app, "seller@mail.com", true).await;
    let (status, _) = request(
        &app,
        "PATCH",
        "/api/products/999/",
        Some(&token),
        Some(json!({ "price": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_updates_are_owner_only() {
    let (_, app) = spawn_app().await;

    let owner_token = signup(&app, "owner@mail.com", true).await;
    let product = create_product(&app, &owner_token, "Mountain bike", "2500.00").await;
    let id = product["id"].as_i64().unwrap();

    let rival_token = signup(&app, "rival@mail.com", true).await;
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/products/{id}/"),
        Some(&rival_token),
        Some(json!({ "price": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        json!("You do not have permission to perform this action.")
    );

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/products/{id}/"),
        Some(&owner_token),
        Some(json!({ "price": "1999.99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], json!("1999.99"));
    assert_eq!(body["description"], json!("Mountain bike"));
    assert_eq!(body["seller"]["email"], json!("owner@mail.com"));
}

#[tokio::test]
async fn product_update_ignores_unknown_and_read_only_fields() {
    let (state, app) = spawn_app().await;

    let token = signup(&app, "owner@mail.com", true).await;
    let product = create_product(&app, &token, "Mountain bike", "2500.00").await;
    let id = product["id"].as_i64().unwrap() as i32;

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/products/{id}/"),
        Some(&token),
        Some(json!({ "is_active": false, "user_id": 999, "quantity": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], json!(3));
    assert_eq!(body["is_active"], json!(true));

    let stored = state.store.get_product(id).await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.quantity, 3);
}

#[tokio::test]
async fn empty_update_returns_current_state() {
    let (_, app) = spawn_app().await;

    let token = signup(&app, "owner@mail.com", true).await;
    let product = create_product(&app, &token, "Mountain bike", "2500.00").await;
    let id = product["id"].as_i64().unwrap();

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/products/{id}/"),
        Some(&token),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("Mountain bike"));
    assert_eq!(body["price"], json!("2500.00"));
    assert_eq!(body["quantity"], json!(5));
}

#[tokio::test]
async fn routes_require_their_trailing_slash() {
    let (_, app) = spawn_app().await;

    let (status, _) = request(&app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&app, "GET", "/api/products/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
