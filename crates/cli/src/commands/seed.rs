//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Fashion
//!     slug: fashion
//! products:
//!   - name: Ankara Tote
//!     category: fashion
//!     price: "25.00"
//!     price_ngn: "38000"
//!     images: [https://cdn.example.com/tote.jpg]
//!     stock: 12
//!     variants:
//!       - name: Blue
//!         price_ghs: "320"
//! ```
//!
//! Categories are upserted by slug. Products are always inserted, so run with
//! `--clear` to replace a catalog instead of appending to it.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use oja_core::CategoryId;

use super::{CommandError, connect};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    pub description: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub price_ngn: Option<Decimal>,
    pub price_ghs: Option<Decimal>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub variants: Vec<SeedVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedVariant {
    pub name: String,
    pub price: Option<Decimal>,
    pub price_ngn: Option<Decimal>,
    pub price_ghs: Option<Decimal>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i32,
}

const fn active() -> bool {
    true
}

fn is_unpriced(price: Option<Decimal>, ngn: Option<Decimal>, ghs: Option<Decimal>) -> bool {
    [price, ngn, ghs]
        .into_iter()
        .flatten()
        .all(|amount| amount <= Decimal::ZERO)
}

impl CatalogFile {
    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML or unknown fields.
    pub fn parse(yaml: &str) -> Result<Self, CommandError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check the catalog for mistakes the database would not catch.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Invalid`] for duplicate slugs, negative prices
    /// or stock, and blank names.
    pub fn validate(&self) -> Result<(), CommandError> {
        let mut slugs = HashSet::new();
        for category in &self.categories {
            if category.slug.trim().is_empty() || category.name.trim().is_empty() {
                return Err(CommandError::Invalid("category name and slug are required".into()));
            }
            if !slugs.insert(category.slug.as_str()) {
                return Err(CommandError::Invalid(format!(
                    "duplicate category slug '{}'",
                    category.slug
                )));
            }
        }

        for product in &self.products {
            if product.name.trim().is_empty() {
                return Err(CommandError::Invalid("product name is required".into()));
            }
            let prices = [product.price, product.price_ngn, product.price_ghs];
            let variant_prices = product
                .variants
                .iter()
                .flat_map(|v| [v.price, v.price_ngn, v.price_ghs]);
            if prices.into_iter().chain(variant_prices).flatten().any(|p| p < Decimal::ZERO) {
                return Err(CommandError::Invalid(format!(
                    "'{}' has a negative price",
                    product.name
                )));
            }
            if product.stock < 0 || product.variants.iter().any(|v| v.stock < 0) {
                return Err(CommandError::Invalid(format!(
                    "'{}' has negative stock",
                    product.name
                )));
            }
        }
        Ok(())
    }

    /// Products that could not be bought at any location.
    #[must_use]
    pub fn unpriced_products(&self) -> Vec<&str> {
        self.products
            .iter()
            .filter(|p| {
                is_unpriced(p.price, p.price_ngn, p.price_ghs)
                    && p.variants
                        .iter()
                        .all(|v| is_unpriced(v.price, v.price_ngn, v.price_ghs))
            })
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Load a catalog file into the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, a category slug
/// is unknown, or a database operation fails. Nothing is written on error.
pub async fn catalog(file_path: &str, clear: bool) -> Result<(), CommandError> {
    let yaml = std::fs::read_to_string(file_path).map_err(|source| CommandError::Io {
        path: file_path.to_string(),
        source,
    })?;
    let file = CatalogFile::parse(&yaml)?;
    file.validate()?;

    for name in file.unpriced_products() {
        warn!(product = name, "Product has no price and will not be purchasable");
    }

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    if clear {
        info!("Clearing existing catalog...");
        sqlx::query("DELETE FROM product_variants").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
    }

    let categories = upsert_categories(&mut tx, &file.categories).await?;
    let (products, variants) = insert_products(&mut tx, &file.products, &categories).await?;

    tx.commit().await?;
    info!(
        categories = file.categories.len(),
        products, variants, "Catalog seeded"
    );
    Ok(())
}

async fn upsert_categories(
    tx: &mut Transaction<'_, Postgres>,
    categories: &[SeedCategory],
) -> Result<HashMap<String, CategoryId>, CommandError> {
    let mut ids = HashMap::new();
    for category in categories {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET name = $1, description = $3
            RETURNING id
            ",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .fetch_one(&mut **tx)
        .await?;
        ids.insert(category.slug.clone(), id);
    }
    Ok(ids)
}

async fn category_id(
    tx: &mut Transaction<'_, Postgres>,
    known: &HashMap<String, CategoryId>,
    slug: &str,
) -> Result<CategoryId, CommandError> {
    if let Some(id) = known.get(slug) {
        return Ok(*id);
    }
    sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CommandError::Invalid(format!("unknown category '{slug}'")))
}

async fn insert_products(
    tx: &mut Transaction<'_, Postgres>,
    products: &[SeedProduct],
    categories: &HashMap<String, CategoryId>,
) -> Result<(usize, usize), CommandError> {
    let mut variant_count = 0;
    for product in products {
        let category = match product.category.as_deref() {
            Some(slug) => Some(category_id(tx, categories, slug).await?),
            None => None,
        };

        let product_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO products
                (name, description, category_id, price, price_ngn, price_ghs,
                 image_url, images, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(category)
        .bind(product.price)
        .bind(product.price_ngn)
        .bind(product.price_ghs)
        .bind(&product.image_url)
        .bind(&product.images)
        .bind(product.stock)
        .bind(product.is_active)
        .fetch_one(&mut **tx)
        .await?;

        for variant in &product.variants {
            sqlx::query(
                r"
                INSERT INTO product_variants
                    (product_id, name, price, price_ngn, price_ghs, image_url, stock)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(product_id)
            .bind(&variant.name)
            .bind(variant.price)
            .bind(variant.price_ngn)
            .bind(variant.price_ghs)
            .bind(&variant.image_url)
            .bind(variant.stock)
            .execute(&mut **tx)
            .await?;
            variant_count += 1;
        }
    }
    Ok((products.len(), variant_count))
}
