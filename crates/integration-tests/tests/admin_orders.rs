//! Integration tests for the admin order API and site settings.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use oja_integration_tests::{TOTE, TestApp, customer, decimal};

async fn place_order(app: &mut TestApp, country: &str) -> Value {
    app.new_visitor();
    app.send(Method::PUT, "/api/location", Some(json!({"country_code": country})))
        .await;
    app.send(Method::POST, "/api/cart/items", Some(json!({"product_id": TOTE})))
        .await;
    let (status, order) = app
        .send(
            Method::POST,
            "/api/cart/checkout",
            Some(json!({"customer": customer(), "payment_method": "cash_on_delivery"})),
        )
        .await;
    assert_eq!(status, 201, "{order}");
    order
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let mut app = TestApp::new().await;

    let (status, _) = app.send(Method::GET, "/api/orders", None).await;
    assert_eq!(status, 401);

    let (status, _) = app
        .send_with(
            Method::GET,
            "/api/orders/stats",
            None,
            &[("authorization", "Bearer wrong-token")],
        )
        .await;
    assert_eq!(status, 401);

    let (status, _) = app
        .send(Method::PUT, "/api/settings", Some(json!({"store_name": "Mine"})))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_status_lifecycle() {
    let mut app = TestApp::new().await;
    let order = place_order(&mut app, "NG").await;
    let uri = format!("/api/orders/{}", order["id"]);

    for status in ["processing", "shipped", "delivered"] {
        let (code, updated) = app
            .admin(Method::PUT, &uri, Some(json!({"status": status})))
            .await;
        assert_eq!(code, 200, "{updated}");
        assert_eq!(updated["status"], status);
    }

    let (code, body) = app
        .admin(Method::PUT, &uri, Some(json!({"status": "pending"})))
        .await;
    assert_eq!(code, 409);
    assert!(body["error"].as_str().unwrap().contains("delivered"));

    let (code, _) = app
        .admin(Method::PUT, &uri, Some(json!({"status": "archived"})))
        .await;
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_missing_orders() {
    let mut app = TestApp::new().await;

    let (status, _) = app.admin(Method::GET, "/api/orders/42", None).await;
    assert_eq!(status, 404);
    let (status, _) = app
        .admin(Method::PUT, "/api/orders/42", Some(json!({"status": "shipped"})))
        .await;
    assert_eq!(status, 404);
    let (status, _) = app.admin(Method::DELETE, "/api/orders/42", None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_delete_order() {
    let mut app = TestApp::new().await;
    let order = place_order(&mut app, "GH").await;
    let uri = format!("/api/orders/{}", order["id"]);

    let (status, _) = app.admin(Method::DELETE, &uri, None).await;
    assert_eq!(status, 204);
    let (status, _) = app.admin(Method::GET, &uri, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_stats_group_revenue_by_currency() {
    let mut app = TestApp::new().await;
    place_order(&mut app, "NG").await;
    place_order(&mut app, "NG").await;
    let cancelled = place_order(&mut app, "US").await;
    app.admin(
        Method::PUT,
        &format!("/api/orders/{}", cancelled["id"]),
        Some(json!({"status": "cancelled"})),
    )
    .await;

    let (status, stats) = app.admin(Method::GET, "/api/orders/stats", None).await;
    assert_eq!(status, 200);
    assert_eq!(stats["total_orders"], 3);
    assert_eq!(stats["by_status"]["pending"], 2);
    assert_eq!(stats["by_status"]["cancelled"], 1);
    assert_eq!(stats["orders_this_month"], 3);
    assert_eq!(decimal(&stats["revenue"]["NGN"]), Decimal::from(76_000));
    assert!(stats["revenue"].get("USD").is_none());
    // Nothing last month, so growth is undefined.
    assert!(stats["growth_rate"].is_null());
}

#[tokio::test]
async fn test_settings_defaults_and_update() {
    let mut app = TestApp::new().await;

    let (status, settings) = app.send(Method::GET, "/api/settings", None).await;
    assert_eq!(status, 200);
    assert_eq!(settings["store_name"], "Oja");

    let (status, updated) = app
        .admin(
            Method::PUT,
            "/api/settings",
            Some(json!({"store_name": "  Oja Lagos  ", "ga4_measurement_id": "G-TEST123"})),
        )
        .await;
    assert_eq!(status, 200, "{updated}");
    assert_eq!(updated["store_name"], "Oja Lagos");

    app.new_visitor();
    let (_, settings) = app.send(Method::GET, "/api/settings", None).await;
    assert_eq!(settings["store_name"], "Oja Lagos");
    assert_eq!(settings["ga4_measurement_id"], "G-TEST123");
}
