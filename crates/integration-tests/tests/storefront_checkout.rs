//! Integration tests for order submission.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use oja_integration_tests::{
    RETIRED, TOTE, TestApp, WRAP, WRAP_BLUE, customer, decimal, reprice_tote,
};

async fn nigerian_cart(app: &mut TestApp) {
    app.send(Method::PUT, "/api/location", Some(json!({"country_code": "NG"})))
        .await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(json!({"product_id": TOTE, "quantity": 2})),
        )
        .await;
    assert_eq!(status, 200);
}

fn checkout_body() -> serde_json::Value {
    json!({"customer": customer(), "payment_method": "bank_transfer"})
}

// ============================================================================
// Cart checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_creates_order_and_clears_cart() {
    let mut app = TestApp::new().await;
    nigerian_cart(&mut app).await;

    let (status, order) = app
        .send(Method::POST, "/api/cart/checkout", Some(checkout_body()))
        .await;
    assert_eq!(status, 201, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["currency"], "NGN");
    assert_eq!(order["pricing_country"], "NG");
    assert_eq!(decimal(&order["total"]), Decimal::from(76_000));
    assert_eq!(decimal(&order["lines"][0]["unit_price"]), Decimal::from(38_000));

    let (_, cart) = app.send(Method::GET, "/api/cart", None).await;
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let mut app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/api/cart/checkout", Some(checkout_body()))
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_invalid_customer_is_rejected() {
    let mut app = TestApp::new().await;
    nigerian_cart(&mut app).await;

    let mut body = checkout_body();
    body["customer"]["email"] = json!("not-an-email");
    let (status, _) = app.send(Method::POST, "/api/cart/checkout", Some(body)).await;
    assert_eq!(status, 400);

    let (_, cart) = app.send(Method::GET, "/api/cart", None).await;
    assert_eq!(cart["item_count"], 2);
}

#[tokio::test]
async fn test_store_failure_keeps_cart_and_retry_succeeds_once() {
    let mut app = TestApp::new().await;
    nigerian_cart(&mut app).await;

    app.orders.set_unavailable(true);
    let (status, body) = app
        .send(Method::POST, "/api/cart/checkout", Some(checkout_body()))
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["retryable"], true);

    let (_, cart) = app.send(Method::GET, "/api/cart", None).await;
    assert_eq!(cart["item_count"], 2);

    app.orders.set_unavailable(false);
    let (status, order) = app
        .send(Method::POST, "/api/cart/checkout", Some(checkout_body()))
        .await;
    assert_eq!(status, 201);

    let (_, orders) = app.admin(Method::GET, "/api/orders", None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);
}

#[tokio::test]
async fn test_order_keeps_price_after_catalog_edit() {
    let mut app = TestApp::new().await;
    nigerian_cart(&mut app).await;

    let (_, order) = app
        .send(Method::POST, "/api/cart/checkout", Some(checkout_body()))
        .await;
    reprice_tote(&app.catalog, Decimal::from(45_000)).await;

    let (_, stored) = app
        .admin(Method::GET, &format!("/api/orders/{}", order["id"]), None)
        .await;
    assert_eq!(decimal(&stored["lines"][0]["unit_price"]), Decimal::from(38_000));
    assert_eq!(decimal(&stored["total"]), Decimal::from(76_000));

    // New carts see the new price.
    nigerian_cart(&mut app).await;
    let (_, cart) = app.send(Method::GET, "/api/cart", None).await;
    assert_eq!(decimal(&cart["total"]["amount"]), Decimal::from(90_000));
}

// ============================================================================
// Stateless checkout
// ============================================================================

#[tokio::test]
async fn test_priced_checkout_with_idempotency_key() {
    let mut app = TestApp::new().await;
    let key = Uuid::new_v4().to_string();
    let body = json!({
        "customer": customer(),
        "items": [
            {"product_id": TOTE, "quantity": 1, "price": "25"},
            {"product_id": WRAP, "variant_id": WRAP_BLUE, "quantity": 2, "price": "40"}
        ],
        "total": "105",
        "payment_method": "card"
    });

    let (status, first) = app
        .send_with(
            Method::POST,
            "/api/check-out",
            Some(body.clone()),
            &[("idempotency-key", key.as_str())],
        )
        .await;
    assert_eq!(status, 201, "{first}");
    assert_eq!(first["currency"], "USD");
    assert_eq!(first["lines"][1]["name"], "Kente Wrap - Blue");

    let (status, second) = app
        .send_with(
            Method::POST,
            "/api/check-out",
            Some(body),
            &[("idempotency-key", key.as_str())],
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(second["id"], first["id"]);

    let (_, orders) = app.admin(Method::GET, "/api/orders", None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_priced_checkout_validation() {
    let mut app = TestApp::new().await;

    let mismatch = json!({
        "customer": customer(),
        "items": [{"product_id": TOTE, "quantity": 2, "price": "25"}],
        "total": "25",
        "payment_method": "card"
    });
    let (status, body) = app.send(Method::POST, "/api/check-out", Some(mismatch)).await;
    assert_eq!(status, 422);
    assert_eq!(body["retryable"], false);

    let unknown = json!({
        "customer": customer(),
        "items": [{"product_id": 999, "quantity": 1, "price": "10"}],
        "total": "10",
        "payment_method": "card"
    });
    let (status, _) = app.send(Method::POST, "/api/check-out", Some(unknown)).await;
    assert_eq!(status, 422);

    let too_many = json!({
        "customer": customer(),
        "items": [{"product_id": TOTE, "quantity": 1000, "price": "1"}],
        "total": "1000",
        "payment_method": "card"
    });
    let (status, body) = app.send(Method::POST, "/api/check-out", Some(too_many)).await;
    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap().contains("999"));

    let retired = json!({
        "customer": customer(),
        "items": [{"product_id": RETIRED, "quantity": 1, "price": "5"}],
        "total": "5",
        "payment_method": "card"
    });
    let (status, _) = app.send(Method::POST, "/api/check-out", Some(retired)).await;
    assert_eq!(status, 422);

    let conflicting = json!({
        "customer": customer(),
        "items": [
            {"product_id": TOTE, "quantity": 1, "price": "25"},
            {"product_id": TOTE, "quantity": 1, "price": "1"}
        ],
        "total": "26",
        "payment_method": "card"
    });
    let (status, _) = app.send(Method::POST, "/api/check-out", Some(conflicting)).await;
    assert_eq!(status, 422);

    let (status, _) = app
        .send_with(
            Method::POST,
            "/api/check-out",
            Some(json!({})),
            &[("idempotency-key", "not-a-uuid")],
        )
        .await;
    assert_eq!(status, 400);

    let (_, orders) = app.admin(Method::GET, "/api/orders", None).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_priced_checkout_merges_repeated_items() {
    let mut app = TestApp::new().await;
    let body = json!({
        "customer": customer(),
        "items": [
            {"product_id": TOTE, "quantity": 2, "price": "25"},
            {"product_id": TOTE, "quantity": 1, "price": "25"}
        ],
        "total": "75",
        "payment_method": "card"
    });

    let (status, order) = app.send(Method::POST, "/api/check-out", Some(body)).await;
    assert_eq!(status, 201, "{order}");
    assert_eq!(order["lines"].as_array().unwrap().len(), 1);
    assert_eq!(order["lines"][0]["quantity"], 3);
}

#[tokio::test]
async fn test_priced_checkout_rejects_out_of_range_amounts() {
    let mut app = TestApp::new().await;
    let body = json!({
        "customer": customer(),
        "items": [{"product_id": TOTE, "quantity": 2, "price": "79228162514264337593543950335"}],
        "total": "1",
        "payment_method": "card"
    });

    let (status, body) = app.send(Method::POST, "/api/check-out", Some(body)).await;
    assert_eq!(status, 422, "{body}");
    assert_eq!(body["retryable"], false);

    // Each line fits but the sum does not.
    let body = json!({
        "customer": customer(),
        "items": [
            {"product_id": TOTE, "quantity": 1, "price": "79228162514264337593543950335"},
            {"product_id": WRAP, "variant_id": WRAP_BLUE, "quantity": 1, "price": "79228162514264337593543950335"}
        ],
        "total": "1",
        "payment_method": "card"
    });
    let (status, _) = app.send(Method::POST, "/api/check-out", Some(body)).await;
    assert_eq!(status, 422);

    // The app keeps serving.
    let (status, _) = app.send(Method::GET, "/api/products", None).await;
    assert_eq!(status, 200);
}
