//! Catalog repository backed by `PostgreSQL`.

use async_trait::async_trait;
use sqlx::PgPool;

use oja_core::{Category, Product, ProductId, ProductVariant, VariantId};

use super::{CatalogRepository, RepositoryError};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.category_id, p.price, p.price_ngn, \
     p.price_ghs, p.image_url, p.images, p.stock, p.is_active, p.created_at, p.updated_at";

const VARIANT_COLUMNS: &str =
    "id, product_id, name, price, price_ngn, price_ghs, image_url, stock";

/// Catalog queries against the `products`, `product_variants`, and
/// `categories` tables.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active
              AND ($1::TEXT IS NULL OR c.slug = $1)
            ORDER BY p.created_at DESC, p.id DESC
            "
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    async fn list_variants(&self, product_id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = $1 ORDER BY id"
        );

        let variants = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1");

        let variant = sqlx::query_as::<_, ProductVariant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
