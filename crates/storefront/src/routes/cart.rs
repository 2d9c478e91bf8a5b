//! Cart route handlers.
//!
//! The cart lives in the session as a [`CartLedger`]. Every response carries
//! the totals recomputed for the visitor's current location.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use oja_core::{
    CartItem, CartLedger, CartLine, CurrencyCode, Customer, ItemRef, LocationInfo, Order,
    PaymentMethod, ProductId, VariantId,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session::{checkout_key, finish_checkout, load_cart, save_cart};
use crate::models::{PriceView, PricingContext};
use crate::state::AppState;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Identifies a product, or one of its variants.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ItemSelector {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

impl ItemSelector {
    const fn item_ref(self) -> ItemRef {
        match self.variant_id {
            Some(variant_id) => ItemRef::Variant {
                product_id: self.product_id,
                variant_id,
            },
            None => ItemRef::Product {
                product_id: self.product_id,
            },
        }
    }
}

const fn one() -> i64 {
    1
}

/// Add to cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub item: ItemSelector,
    #[serde(default = "one")]
    pub quantity: i64,
}

/// Set a line's quantity. Zero or below removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub item: ItemSelector,
    pub quantity: i64,
}

/// Checkout form.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub payment_method: PaymentMethod,
}

/// One cart line as displayed.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub item: ItemRef,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: PriceView,
    pub line_total: PriceView,
}

impl CartLineView {
    fn new(line: &CartLine, pricing: &PricingContext) -> Self {
        Self {
            item: line.item().item,
            name: line.item().name.clone(),
            image_url: line.item().image_url.clone(),
            quantity: line.quantity(),
            unit_price: pricing.amount(line.unit_price(pricing.location())),
            line_total: pricing.amount(line.line_total(pricing.location())),
        }
    }
}

/// The cart with derived figures.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub total: PriceView,
    pub currency: CurrencyCode,
    pub location: Option<LocationInfo>,
}

impl CartView {
    fn new(cart: &CartLedger, pricing: &PricingContext) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, pricing))
                .collect(),
            item_count: cart.item_count(),
            total: pricing.amount(cart.total(pricing.location())),
            currency: pricing.currency,
            location: pricing.location.clone(),
        }
    }
}

async fn cart_view(
    state: &AppState,
    session: &Session,
    cart: &CartLedger,
) -> Result<Json<CartView>> {
    let pricing = PricingContext::load(state.detections(), session).await?;
    Ok(Json(CartView::new(cart, &pricing)))
}

/// Snapshot the selected product or variant from the catalog.
async fn snapshot(state: &AppState, selector: ItemSelector) -> Result<CartItem> {
    let product = state
        .catalog()
        .get_product(selector.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product {}", selector.product_id)))?;

    match selector.variant_id {
        Some(variant_id) => {
            let variant = state
                .catalog()
                .get_variant(variant_id)
                .await?
                .filter(|v| v.product_id == product.id)
                .ok_or_else(|| AppError::NotFound(format!("Variant {variant_id}")))?;
            Ok(CartItem::from_variant(&product, &variant))
        }
        None => Ok(CartItem::from_product(&product)),
    }
}

/// Show the cart.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    cart_view(&state, &session, &cart).await
}

/// Add an item, merging with an existing line.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    payload: JsonBody<AddItemRequest>,
) -> Result<Json<CartView>> {
    let Json(request) = payload?;
    let item = snapshot(&state, request.item).await?;

    let mut cart = load_cart(&session).await?;
    cart.add(item, request.quantity)?;
    save_cart(&session, &cart).await?;

    cart_view(&state, &session, &cart).await
}

/// Replace a line's quantity.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    payload: JsonBody<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let Json(request) = payload?;

    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&request.item.item_ref(), request.quantity)?;
    save_cart(&session, &cart).await?;

    cart_view(&state, &session, &cart).await
}

/// Remove a line. Removing an absent line succeeds.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    payload: JsonBody<ItemSelector>,
) -> Result<Json<CartView>> {
    let Json(selector) = payload?;

    let mut cart = load_cart(&session).await?;
    cart.remove(&selector.item_ref());
    save_cart(&session, &cart).await?;

    cart_view(&state, &session, &cart).await
}

/// Empty the cart.
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;

    cart_view(&state, &session, &cart).await
}

/// Place an order for the cart.
///
/// Prices are frozen at the visitor's current location. The cart is emptied
/// only once the order exists; any failure leaves it as it was.
#[instrument(skip(state, session, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    payload: JsonBody<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(request) = payload?;
    let cart = load_cart(&session).await?;
    let pricing = PricingContext::load(state.detections(), &session).await?;
    let key = checkout_key(&session).await?;

    let order = state
        .checkout()
        .checkout_cart(
            &cart,
            request.customer,
            request.payment_method,
            pricing.location(),
            pricing.currency,
            key,
        )
        .await?;

    finish_checkout(&session).await?;
    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_builds_item_refs() {
        let product = ItemSelector {
            product_id: ProductId::new(3),
            variant_id: None,
        };
        assert_eq!(
            product.item_ref(),
            ItemRef::Product {
                product_id: ProductId::new(3)
            }
        );

        let variant = ItemSelector {
            product_id: ProductId::new(3),
            variant_id: Some(VariantId::new(9)),
        };
        assert_eq!(variant.item_ref().variant_id(), Some(VariantId::new(9)));
    }

    #[test]
    fn test_add_request_defaults_to_one() {
        let request: AddItemRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(request.quantity, 1);
        assert_eq!(request.item.variant_id, None);
    }
}
