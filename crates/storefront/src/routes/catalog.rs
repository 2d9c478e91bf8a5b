//! Product and category route handlers.
//!
//! Every price is resolved for the visitor's location and formatted in their
//! display currency.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use oja_core::{Category, CategoryId, Product, ProductId, ProductVariant, VariantId, primary_image};

use crate::error::{AppError, Result};
use crate::models::{PriceView, PricingContext};
use crate::state::AppState;

/// Product listing filter.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    /// Category slug.
    pub category: Option<String>,
}

/// Product as shown in listings.
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub price: PriceView,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

impl ProductSummary {
    fn new(product: &Product, pricing: &PricingContext) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category_id: product.category_id,
            price: pricing.price(product),
            image_url: primary_image(product, None).map(str::to_owned),
            in_stock: product.stock > 0,
        }
    }
}

/// A variant with its resolved price.
#[derive(Debug, Serialize)]
pub struct VariantView {
    pub id: VariantId,
    pub name: String,
    pub price: PriceView,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

/// Product detail.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub variants: Vec<VariantView>,
}

impl ProductDetail {
    fn new(product: &Product, variants: &[ProductVariant], pricing: &PricingContext) -> Self {
        let variants = variants
            .iter()
            .map(|v| VariantView {
                id: v.id,
                name: v.name.clone(),
                price: pricing.price(v),
                image_url: primary_image(product, Some(v)).map(str::to_owned),
                in_stock: v.stock > 0,
            })
            .collect();

        Self {
            summary: ProductSummary::new(product, pricing),
            description: product.description.clone(),
            images: product
                .images
                .iter()
                .filter(|url| !url.trim().is_empty())
                .cloned()
                .collect(),
            variants,
        }
    }
}

/// List active products.
#[instrument(skip(state, session))]
pub async fn list_products(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductSummary>>> {
    let pricing = PricingContext::load(state.detections(), &session).await?;
    let category = query.category.as_deref().filter(|c| !c.trim().is_empty());
    let products = state.catalog().list_products(category).await?;

    Ok(Json(
        products
            .iter()
            .map(|p| ProductSummary::new(p, &pricing))
            .collect(),
    ))
}

/// Show one active product with its variants.
#[instrument(skip(state, session))]
pub async fn show_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let product = state
        .catalog()
        .get_product(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;
    let variants = state.catalog().list_variants(id).await?;
    let pricing = PricingContext::load(state.detections(), &session).await?;

    Ok(Json(ProductDetail::new(&product, &variants, &pricing)))
}

/// List categories.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().list_categories().await?))
}
