//! In-process repositories.
//!
//! Used by the router tests and for running the API without a database.
//! State lives behind `tokio` locks and is lost when the process exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, RwLock};

use oja_core::{
    Category, Order, OrderId, OrderStatus, OrderSubmission, Product, ProductId, ProductVariant,
    VariantId,
};

use super::{CatalogRepository, OrderRepository, RepositoryError, SettingsRepository};

/// Catalog held in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    categories: RwLock<Vec<Category>>,
    products: RwLock<Vec<Product>>,
    variants: RwLock<Vec<ProductVariant>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a category.
    pub async fn put_category(&self, category: Category) {
        let mut categories = self.categories.write().await;
        categories.retain(|c| c.id != category.id);
        categories.push(category);
    }

    /// Insert or replace a product. Replacing is how tests simulate an admin
    /// editing a price.
    pub async fn put_product(&self, product: Product) {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Insert or replace a variant.
    pub async fn put_variant(&self, variant: ProductVariant) {
        let mut variants = self.variants.write().await;
        match variants.iter_mut().find(|v| v.id == variant.id) {
            Some(existing) => *existing = variant,
            None => variants.push(variant),
        }
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let category_id = match category {
            Some(slug) => {
                let categories = self.categories.read().await;
                match categories.iter().find(|c| c.slug == slug) {
                    Some(c) => Some(c.id),
                    None => return Ok(Vec::new()),
                }
            }
            None => None,
        };

        let mut products: Vec<Product> = self
            .products
            .read()
            .await
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let mut variants: Vec<ProductVariant> = self
            .variants
            .read()
            .await
            .iter()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect();
        variants.sort_by_key(|v| v.id);
        Ok(variants)
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        Ok(self.variants.read().await.iter().find(|v| v.id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories = self.categories.read().await.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

/// Order store held in memory.
///
/// [`set_unavailable`](Self::set_unavailable) makes every call fail as if
/// the database had stopped answering.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<Vec<Order>>,
    unavailable: AtomicBool,
}

impl MemoryOrders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated store outages.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn create(&self, submission: OrderSubmission) -> Result<Order, RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.lock().await;

        if let Some(existing) = orders
            .iter()
            .find(|o| o.idempotency_key == submission.idempotency_key)
        {
            return Ok(existing.clone());
        }

        let next_id = orders.iter().map(|o| o.id.as_i32()).max().unwrap_or(0) + 1;
        let order = Order::from_submission(OrderId::new(next_id), submission, Utc::now());
        orders.push(order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.lock().await.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        Ok(self.orders.lock().await.iter().find(|o| o.id == id).cloned())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.lock().await;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut orders = self.orders.lock().await;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        if orders.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Settings held in memory.
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepository for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &JsonValue) -> Result<(), RepositoryError> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.clone());
        Ok(())
    }
}
