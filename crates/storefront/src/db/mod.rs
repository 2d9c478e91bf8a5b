//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `categories`, `products`, `product_variants` - The catalog
//! - `orders` - Placed orders (customer and lines frozen as JSONB)
//! - `settings` - Site settings (JSONB per key)
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Handlers talk to the traits below rather than to a pool, so the router
//! can run against [`memory`] repositories in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p oja-cli -- migrate
//! ```

pub mod catalog;
pub mod memory;
pub mod orders;
pub mod settings;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use oja_core::{
    Category, Order, OrderId, OrderStatus, OrderSubmission, Product, ProductId, ProductVariant,
    VariantId,
};

pub use catalog::PgCatalogRepository;
pub use orders::PgOrderRepository;
pub use settings::PgSettingsRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Read access to the catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active products, newest first, optionally limited to a category slug.
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    /// A product by id, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Variants of a product, in id order.
    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// A variant by id.
    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError>;

    /// All categories by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;
}

/// The order store.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a submission as a pending order.
    ///
    /// Reusing an idempotency key returns the order created the first time
    /// instead of inserting a second one.
    async fn create(&self, submission: OrderSubmission) -> Result<Order, RepositoryError>;

    /// All orders, newest first.
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;

    /// An order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Overwrite the status and bump `updated_at`.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError>;

    /// Delete an order. Returns [`RepositoryError::NotFound`] when absent.
    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError>;
}

/// Key/value settings storage.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError>;

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
