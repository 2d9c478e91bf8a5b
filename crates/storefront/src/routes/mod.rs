//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Liveness
//! GET    /health/ready          - Readiness (database ping)
//!
//! # Catalog
//! GET    /api/products          - Active products (?category=<slug>)
//! GET    /api/products/{id}     - Product detail with variants
//! GET    /api/categories        - Category list
//!
//! # Location
//! GET    /api/location          - Session location (detects on first call)
//! POST   /api/location/detect   - Detect again, skipping the cache
//! PUT    /api/location          - Manual country selection
//! PUT    /api/currency          - Display currency preference
//!
//! # Cart (session)
//! GET    /api/cart              - Cart with derived totals
//! POST   /api/cart/items        - Add
//! PUT    /api/cart/items        - Set quantity
//! DELETE /api/cart/items        - Remove
//! DELETE /api/cart              - Clear
//! POST   /api/cart/checkout     - Place an order for the cart
//!
//! # Stateless checkout
//! POST   /api/check-out         - Place an order from a priced item list
//!
//! # Admin (Authorization: Bearer <ADMIN_API_TOKEN>)
//! GET    /api/orders            - Orders, newest first
//! GET    /api/orders/stats      - Counts, revenue, growth
//! GET    /api/orders/{id}       - Order detail
//! PUT    /api/orders/{id}       - Update status
//! DELETE /api/orders/{id}       - Delete
//! GET    /api/settings          - Site settings (public)
//! PUT    /api/settings          - Replace site settings
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod location;
pub mod orders;
pub mod settings;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{id}", get(catalog::show_product))
        .route("/categories", get(catalog::list_categories))
}

/// Create the location routes router.
pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/location",
            get(location::get_location).put(location::set_location),
        )
        .route("/location/detect", post(location::detect_location))
        .route("/currency", put(location::set_currency))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route(
            "/items",
            post(cart::add).put(cart::update).delete(cart::remove),
        )
        .route("/checkout", post(cart::checkout))
}

/// Create the admin order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/stats", get(orders::stats))
        .route(
            "/{id}",
            get(orders::show).put(orders::update).delete(orders::delete),
        )
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .merge(location_routes())
        .nest("/cart", cart_routes())
        .route("/check-out", post(checkout::check_out))
        .nest("/orders", order_routes())
        .route("/settings", get(settings::show).put(settings::update));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}
