//! Checkout submission.
//!
//! Turns a cart (or a client-priced item list) into an order in the order
//! store. Validation failures are the customer's to fix; store failures are
//! transient and safe to retry with the same idempotency key.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use oja_core::{
    CartLedger, CheckoutValidationError, CurrencyCode, Customer, ItemRef, LocationInfo, Order,
    OrderLine, OrderSubmission, PaymentMethod, ProductId, VariantId, build_order_payload,
};

use crate::db::{CatalogRepository, OrderRepository, RepositoryError};

/// Why an order was not created.
#[derive(Debug, Error)]
pub enum OrderSubmissionError {
    /// The request itself is wrong; retrying will not help.
    #[error(transparent)]
    Validation(#[from] CheckoutValidationError),
    /// The order store could not be reached.
    #[error("order store unavailable: {0}")]
    Unavailable(#[source] RepositoryError),
}

impl OrderSubmissionError {
    /// Whether the same request may succeed if sent again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// One line of a client-priced checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PricedItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Decimal,
}

/// A checkout where the client supplies prices, as sent to `/api/check-out`.
#[derive(Debug, Clone, Deserialize)]
pub struct PricedCheckout {
    pub customer: Customer,
    pub items: Vec<PricedItem>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub currency: CurrencyCode,
}

/// Freezes checkouts into orders.
#[derive(Clone)]
pub struct CheckoutSubmitter {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CheckoutSubmitter {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { orders, catalog }
    }

    /// Persist an already built submission.
    ///
    /// # Errors
    ///
    /// Returns [`OrderSubmissionError::Unavailable`] when the store fails.
    #[instrument(skip(self, submission), fields(idempotency_key = %submission.idempotency_key, total = %submission.total))]
    pub async fn submit(&self, submission: OrderSubmission) -> Result<Order, OrderSubmissionError> {
        let order = self
            .orders
            .create(submission)
            .await
            .map_err(OrderSubmissionError::Unavailable)?;

        tracing::info!(order_id = %order.id, "Order placed");
        Ok(order)
    }

    /// Build and submit an order from the visitor's cart.
    ///
    /// The cart is only read. Clearing it after success is the caller's job,
    /// so a failure leaves it exactly as it was.
    ///
    /// # Errors
    ///
    /// Validation errors from [`build_order_payload`], or
    /// [`OrderSubmissionError::Unavailable`] when the store fails.
    pub async fn checkout_cart(
        &self,
        cart: &CartLedger,
        customer: Customer,
        payment_method: PaymentMethod,
        location: Option<&LocationInfo>,
        currency: CurrencyCode,
        idempotency_key: Uuid,
    ) -> Result<Order, OrderSubmissionError> {
        let submission = build_order_payload(
            cart,
            customer,
            payment_method,
            location,
            currency,
            idempotency_key,
        )?;
        self.submit(submission).await
    }

    /// Submit a checkout priced by the client.
    ///
    /// Item names come from the catalog; prices are taken as sent but must
    /// add up to the submitted total. Repeated items at the same price are
    /// merged into one line.
    ///
    /// # Errors
    ///
    /// [`CheckoutValidationError::UnknownItem`] for products or variants that
    /// do not exist, [`CheckoutValidationError::Inactive`] for products no
    /// longer for sale, [`CheckoutValidationError::DuplicateItem`] when the
    /// same item is sent at two prices, other validation errors from
    /// [`OrderSubmission::from_priced_lines`], or
    /// [`OrderSubmissionError::Unavailable`] when a store fails.
    pub async fn checkout_priced(
        &self,
        request: PricedCheckout,
        idempotency_key: Uuid,
    ) -> Result<Order, OrderSubmissionError> {
        let mut merged: Vec<(ItemRef, String, u32, Decimal)> =
            Vec::with_capacity(request.items.len());
        for item in &request.items {
            let (item_ref, name) = self.resolve_item(item).await?;
            match merged.iter_mut().find(|(r, ..)| *r == item_ref) {
                Some((.., quantity, price)) if *price == item.price => {
                    *quantity = quantity.saturating_add(item.quantity);
                }
                Some(_) => return Err(CheckoutValidationError::DuplicateItem(name).into()),
                None => merged.push((item_ref, name, item.quantity, item.price)),
            }
        }

        let lines = merged
            .into_iter()
            .map(|(item_ref, name, quantity, price)| {
                OrderLine::new(item_ref, name, quantity, price)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let submission = OrderSubmission::from_priced_lines(
            request.customer,
            lines,
            request.total,
            request.currency,
            request.payment_method,
            idempotency_key,
        )?;
        self.submit(submission).await
    }

    async fn resolve_item(
        &self,
        item: &PricedItem,
    ) -> Result<(ItemRef, String), OrderSubmissionError> {
        let product = self
            .catalog
            .get_product(item.product_id)
            .await
            .map_err(OrderSubmissionError::Unavailable)?
            .ok_or_else(|| {
                CheckoutValidationError::UnknownItem(format!("product {}", item.product_id))
            })?;
        if !product.is_active {
            return Err(CheckoutValidationError::Inactive(product.name).into());
        }

        let resolved = match item.variant_id {
            Some(variant_id) => {
                let variant = self
                    .catalog
                    .get_variant(variant_id)
                    .await
                    .map_err(OrderSubmissionError::Unavailable)?
                    .filter(|v| v.product_id == product.id)
                    .ok_or_else(|| {
                        CheckoutValidationError::UnknownItem(format!("variant {variant_id}"))
                    })?;
                (
                    ItemRef::Variant {
                        product_id: product.id,
                        variant_id,
                    },
                    format!("{} - {}", product.name, variant.name),
                )
            }
            None => (
                ItemRef::Product {
                    product_id: product.id,
                },
                product.name,
            ),
        };

        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use oja_core::{CartItem, Email, Product};

    use super::*;
    use crate::db::memory::{MemoryCatalog, MemoryOrders};

    fn customer() -> Customer {
        Customer {
            name: "Kofi Boateng".into(),
            email: Email::parse("kofi@example.com").unwrap(),
            phone: "+233240000000".into(),
            address: "7 Oxford Street".into(),
            city: "Accra".into(),
            country: "Ghana".into(),
            notes: Some("Call on arrival".into()),
        }
    }

    fn product(id: i32, price: i64) -> Product {
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
            stock: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn submitter() -> (CheckoutSubmitter, Arc<MemoryOrders>) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.put_product(product(1, 25)).await;
        let mut retired = product(2, 40);
        retired.is_active = false;
        catalog.put_product(retired).await;
        let orders = Arc::new(MemoryOrders::new());
        (CheckoutSubmitter::new(orders.clone(), catalog), orders)
    }

    #[tokio::test]
    async fn test_checkout_cart_creates_pending_order() {
        let (submitter, orders) = submitter().await;
        let mut cart = CartLedger::new();
        cart.add(CartItem::from_product(&product(1, 25)), 2).unwrap();

        let order = submitter
            .checkout_cart(
                &cart,
                customer(),
                PaymentMethod::Card,
                None,
                CurrencyCode::USD,
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(order.total, Decimal::from(50));
        assert_eq!(order.status, oja_core::OrderStatus::Pending);
        assert_eq!(orders.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        let (submitter, orders) = submitter().await;
        orders.set_unavailable(true);
        let mut cart = CartLedger::new();
        cart.add(CartItem::from_product(&product(1, 25)), 1).unwrap();

        let err = submitter
            .checkout_cart(
                &cart,
                customer(),
                PaymentMethod::Card,
                None,
                CurrencyCode::USD,
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_cart_is_not_retryable() {
        let (submitter, _) = submitter().await;
        let err = submitter
            .checkout_cart(
                &CartLedger::new(),
                customer(),
                PaymentMethod::Card,
                None,
                CurrencyCode::USD,
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_priced_checkout_names_lines_from_catalog() {
        let (submitter, _) = submitter().await;
        let request = PricedCheckout {
            customer: customer(),
            items: vec![PricedItem {
                product_id: ProductId::new(1),
                variant_id: None,
                quantity: 2,
                price: Decimal::from(30),
            }],
            total: Decimal::from(60),
            payment_method: PaymentMethod::MobileMoney,
            currency: CurrencyCode::GHS,
        };

        let order = submitter
            .checkout_priced(request, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(order.lines[0].name, "Product 1");
        assert_eq!(order.lines[0].unit_price, Decimal::from(30));
        assert_eq!(order.currency, CurrencyCode::GHS);
    }

    #[tokio::test]
    async fn test_priced_checkout_rejects_unknown_product() {
        let (submitter, _) = submitter().await;
        let request = PricedCheckout {
            customer: customer(),
            items: vec![PricedItem {
                product_id: ProductId::new(99),
                variant_id: None,
                quantity: 1,
                price: Decimal::from(10),
            }],
            total: Decimal::from(10),
            payment_method: PaymentMethod::Card,
            currency: CurrencyCode::USD,
        };

        let err = submitter
            .checkout_priced(request, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderSubmissionError::Validation(CheckoutValidationError::UnknownItem(_))
        ));
    }

    fn priced(product_id: i32, quantity: u32, price: i64) -> PricedItem {
        PricedItem {
            product_id: ProductId::new(product_id),
            variant_id: None,
            quantity,
            price: Decimal::from(price),
        }
    }

    fn priced_request(items: Vec<PricedItem>, total: i64) -> PricedCheckout {
        PricedCheckout {
            customer: customer(),
            items,
            total: Decimal::from(total),
            payment_method: PaymentMethod::Card,
            currency: CurrencyCode::USD,
        }
    }

    #[tokio::test]
    async fn test_priced_checkout_merges_repeated_items() {
        let (submitter, _) = submitter().await;
        let request = priced_request(vec![priced(1, 2, 25), priced(1, 1, 25)], 75);

        let order = submitter
            .checkout_priced(request, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 3);
        assert_eq!(order.total, Decimal::from(75));
    }

    #[tokio::test]
    async fn test_priced_checkout_rejects_conflicting_duplicates() {
        let (submitter, orders) = submitter().await;
        let request = priced_request(vec![priced(1, 1, 25), priced(1, 1, 1)], 26);

        let err = submitter
            .checkout_priced(request, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderSubmissionError::Validation(CheckoutValidationError::DuplicateItem(_))
        ));
        assert!(orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_priced_checkout_rejects_inactive_product() {
        let (submitter, _) = submitter().await;
        let err = submitter
            .checkout_priced(priced_request(vec![priced(2, 1, 40)], 40), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderSubmissionError::Validation(CheckoutValidationError::Inactive(_))
        ));
    }

    #[tokio::test]
    async fn test_priced_checkout_caps_merged_quantity() {
        let (submitter, _) = submitter().await;
        let request = priced_request(vec![priced(1, 600, 1), priced(1, 600, 1)], 1_200);

        let err = submitter
            .checkout_priced(request, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderSubmissionError::Validation(CheckoutValidationError::QuantityExceedsLimit { .. })
        ));
    }
}
