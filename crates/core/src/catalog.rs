//! Catalog entities and the cart's view of them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::PricedEntity;
use crate::types::{CategoryId, ProductId, VariantId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// A product offered in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Base price, used when no regional override applies.
    pub price: Option<Decimal>,
    pub price_ngn: Option<Decimal>,
    pub price_ghs: Option<Decimal>,
    /// Legacy single image.
    pub image_url: Option<String>,
    /// Gallery images, first one is the cover.
    pub images: Vec<String>,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variation of a product (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Option<Decimal>,
    pub price_ngn: Option<Decimal>,
    pub price_ghs: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: i32,
}

impl PricedEntity for Product {
    fn base_price(&self) -> Option<Decimal> {
        self.price
    }

    fn price_ngn(&self) -> Option<Decimal> {
        self.price_ngn
    }

    fn price_ghs(&self) -> Option<Decimal> {
        self.price_ghs
    }
}

impl PricedEntity for ProductVariant {
    fn base_price(&self) -> Option<Decimal> {
        self.price
    }

    fn price_ngn(&self) -> Option<Decimal> {
        self.price_ngn
    }

    fn price_ghs(&self) -> Option<Decimal> {
        self.price_ghs
    }
}

/// Pick the image to show for a product, optionally narrowed to a variant.
///
/// Variant image first, then the product's cover image, then its legacy
/// `image_url`. Blank strings count as missing.
#[must_use]
pub fn primary_image<'a>(product: &'a Product, variant: Option<&'a ProductVariant>) -> Option<&'a str> {
    variant
        .and_then(|v| v.image_url.as_deref())
        .into_iter()
        .chain(product.images.iter().map(String::as_str))
        .chain(product.image_url.as_deref())
        .find(|url| !url.trim().is_empty())
}

/// What a cart line points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemRef {
    /// A product sold without variants.
    Product { product_id: ProductId },
    /// A specific variant of a product.
    Variant {
        product_id: ProductId,
        variant_id: VariantId,
    },
}

impl ItemRef {
    /// The product this reference belongs to.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match *self {
            Self::Product { product_id } | Self::Variant { product_id, .. } => product_id,
        }
    }

    /// The variant, if this reference names one.
    #[must_use]
    pub const fn variant_id(&self) -> Option<VariantId> {
        match *self {
            Self::Product { .. } => None,
            Self::Variant { variant_id, .. } => Some(variant_id),
        }
    }
}

/// Snapshot of a purchasable entity kept on a cart line.
///
/// Carries the price fields (not a resolved price) so the cart total can be
/// recomputed for whatever location is current at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub item: ItemRef,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub price_ngn: Option<Decimal>,
    pub price_ghs: Option<Decimal>,
}

impl CartItem {
    /// Snapshot a product sold without variants.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            item: ItemRef::Product {
                product_id: product.id,
            },
            name: product.name.clone(),
            image_url: primary_image(product, None).map(str::to_owned),
            price: product.price,
            price_ngn: product.price_ngn,
            price_ghs: product.price_ghs,
        }
    }

    /// Snapshot one variant of a product.
    #[must_use]
    pub fn from_variant(product: &Product, variant: &ProductVariant) -> Self {
        Self {
            item: ItemRef::Variant {
                product_id: product.id,
                variant_id: variant.id,
            },
            name: format!("{} - {}", product.name, variant.name),
            image_url: primary_image(product, Some(variant)).map(str::to_owned),
            price: variant.price,
            price_ngn: variant.price_ngn,
            price_ghs: variant.price_ghs,
        }
    }
}

impl PricedEntity for CartItem {
    fn base_price(&self) -> Option<Decimal> {
        self.price
    }

    fn price_ngn(&self) -> Option<Decimal> {
        self.price_ngn
    }

    fn price_ghs(&self) -> Option<Decimal> {
        self.price_ghs
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn product(id: i32, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: None,
            category_id: None,
            price: Some(Decimal::from(price)),
            price_ngn: None,
            price_ghs: None,
            image_url: None,
            images: Vec::new(),
            stock: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn variant(id: i32, product_id: i32, price: Option<i64>) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(product_id),
            name: format!("Variant {id}"),
            price: price.map(Decimal::from),
            price_ngn: None,
            price_ghs: None,
            image_url: None,
            stock: 5,
        }
    }
}
