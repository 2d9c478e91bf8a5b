//! Integration tests for Oja.
//!
//! The storefront router is driven in-process with `tower::ServiceExt`,
//! backed by the in-memory repositories and session store, so no database or
//! running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p oja-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_cart` - Location pricing and the session cart
//! - `storefront_checkout` - Order submission, failure, and idempotency
//! - `admin_orders` - Admin order management and site settings

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use oja_core::{Category, CategoryId, Product, ProductId, ProductVariant, VariantId};
use oja_storefront::config::{GeolocationConfig, StorefrontConfig};
use oja_storefront::db::memory::{MemoryCatalog, MemoryOrders, MemorySettings};
use oja_storefront::middleware::session::SESSION_COOKIE_NAME;
use oja_storefront::middleware::session_layer_with_store;
use oja_storefront::state::{AppState, Repositories};

/// Bearer token accepted by the test app's admin API.
pub const ADMIN_TOKEN: &str = "k7Qm2vXp9LrT4wZs8NbYc3HfJd6GaE1u";

/// Seeded product sold without variants: base 25, NGN 38000, no GHS price.
pub const TOTE: ProductId = ProductId::new(1);
/// Seeded product with variants and no prices of its own.
pub const WRAP: ProductId = ProductId::new(2);
/// Variant of [`WRAP`]: base 40, NGN 60000, GHS 500.
pub const WRAP_BLUE: VariantId = VariantId::new(10);
/// Inactive seeded product.
pub const RETIRED: ProductId = ProductId::new(3);

fn config(geo_endpoint: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/oja_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("Zr8#kLq2!vW9mXp4@nTb7$hYc3&fJd6*"),
        admin_token: SecretString::from(ADMIN_TOKEN),
        geolocation: GeolocationConfig {
            endpoint: geo_endpoint.to_string(),
            timeout: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(60),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn product(id: ProductId, name: &str, price: Option<Decimal>, ngn: Option<Decimal>) -> Product {
    let now = Utc::now();
    Product {
        id,
        name: name.to_string(),
        description: None,
        category_id: Some(CategoryId::new(1)),
        price,
        price_ngn: ngn,
        price_ghs: None,
        image_url: None,
        images: vec![format!("https://cdn.oja.test/{id}.jpg")],
        stock: 10,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Storefront router plus handles on its repositories and one visitor's cookie.
pub struct TestApp {
    router: Router,
    pub catalog: Arc<MemoryCatalog>,
    pub orders: Arc<MemoryOrders>,
    cookie: Option<String>,
}

impl TestApp {
    /// App with a seeded catalog. Geolocation points at a closed local port,
    /// so automatic detection fails fast.
    pub async fn new() -> Self {
        Self::with_geolocation("http://127.0.0.1:9/{ip}/json/").await
    }

    /// App whose geolocation lookups go to `endpoint`.
    pub async fn with_geolocation(endpoint: &str) -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog).await;
        let orders = Arc::new(MemoryOrders::new());

        let repos = Repositories {
            catalog: catalog.clone(),
            orders: orders.clone(),
            settings: Arc::new(MemorySettings::new()),
        };
        let state = AppState::new(config(endpoint), None, repos).unwrap();
        let router = oja_storefront::app(state, session_layer_with_store(MemoryStore::default(), false));

        Self {
            router,
            catalog,
            orders,
            cookie: None,
        }
    }

    /// Forget the session cookie, as a new visitor would.
    pub fn new_visitor(&mut self) {
        self.cookie = None;
    }

    /// Send a request as the current visitor.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with(method, uri, body, &[]).await
    }

    /// Send a request with an admin bearer token.
    pub async fn admin(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let auth = format!("Bearer {ADMIN_TOKEN}");
        self.send_with(method, uri, body, &[(header::AUTHORIZATION.as_str(), auth.as_str())])
            .await
    }

    /// Send a request with extra headers, keeping the session cookie current.
    pub async fn send_with(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let (cookie, status, json) = self.dispatch(method, uri, body, headers).await;
        if cookie.is_some() {
            self.cookie = cookie;
        }
        (status, json)
    }

    /// Send a request as the current visitor without taking a new cookie
    /// from the response, so several can be in flight at once.
    pub async fn send_shared(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let (_, status, json) = self.dispatch(method, uri, body, headers).await;
        (status, json)
    }

    async fn dispatch(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (Option<String>, StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE_NAME))
            .and_then(|v| v.split(';').next())
            .map(str::to_string);

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (cookie, status, json)
    }
}

async fn seed(catalog: &MemoryCatalog) {
    catalog
        .put_category(Category {
            id: CategoryId::new(1),
            name: "Fashion".to_string(),
            slug: "fashion".to_string(),
            description: None,
        })
        .await;

    catalog
        .put_product(product(
            TOTE,
            "Ankara Tote",
            Some(Decimal::from(25)),
            Some(Decimal::from(38_000)),
        ))
        .await;
    catalog.put_product(product(WRAP, "Kente Wrap", None, None)).await;
    catalog
        .put_variant(ProductVariant {
            id: WRAP_BLUE,
            product_id: WRAP,
            name: "Blue".to_string(),
            price: Some(Decimal::from(40)),
            price_ngn: Some(Decimal::from(60_000)),
            price_ghs: Some(Decimal::from(500)),
            image_url: None,
            stock: 4,
        })
        .await;

    let mut retired = product(RETIRED, "Old Stock", Some(Decimal::from(5)), None);
    retired.is_active = false;
    catalog.put_product(retired).await;
}

/// A customer payload accepted by checkout.
#[must_use]
pub fn customer() -> Value {
    serde_json::json!({
        "name": "Ada Obi",
        "email": "ada@example.com",
        "phone": "+2348012345678",
        "address": "12 Marina Road",
        "city": "Lagos",
        "country": "Nigeria"
    })
}

/// Read a decimal serialized as a string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

/// Change a seeded product's NGN price, as an admin edit would.
pub async fn reprice_tote(catalog: &MemoryCatalog, price_ngn: Decimal) {
    let mut tote = product(TOTE, "Ankara Tote", Some(Decimal::from(25)), Some(price_ngn));
    tote.updated_at = Utc::now();
    catalog.put_product(tote).await;
}
