//! Customers, order submissions, and placed orders.
//!
//! An [`OrderSubmission`] is the frozen form of a cart: every line carries
//! the unit price resolved at the moment the customer confirmed checkout.
//! Later catalog price edits never reach a submission or the [`Order`]
//! created from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cart::{CartLedger, MAX_LINE_QUANTITY};
use crate::catalog::ItemRef;
use crate::types::{CountryCode, CurrencyCode, Email, LocationInfo, OrderId, OrderStatus, PaymentMethod};

/// Reasons a checkout request cannot become an order.
///
/// These are the customer's to fix; retrying the same request will fail
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutValidationError {
    /// No lines to order.
    #[error("cart is empty")]
    EmptyCart,
    /// A line resolved to a zero or negative price.
    #[error("{0} is missing a price and cannot be ordered")]
    Unpriced(String),
    /// A required customer field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// A line asks for zero of an item.
    #[error("quantity for {0} must be at least 1")]
    InvalidQuantity(String),
    /// A line asks for more than [`MAX_LINE_QUANTITY`] of an item.
    #[error("quantity {quantity} for {item} exceeds the limit of {MAX_LINE_QUANTITY} per item")]
    QuantityExceedsLimit { item: String, quantity: u64 },
    /// The client's total disagrees with the sum of its lines.
    #[error("submitted total {submitted} does not match line total {computed}")]
    TotalMismatch {
        submitted: Decimal,
        computed: Decimal,
    },
    /// The item does not exist in the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(String),
    /// The same item appears twice at different prices.
    #[error("{0} is listed more than once at different prices")]
    DuplicateItem(String),
    /// The item exists but is no longer for sale.
    #[error("{0} is not available")]
    Inactive(String),
    /// A line total or the order total does not fit in a decimal.
    #[error("amount for {0} is out of range")]
    AmountOutOfRange(String),
}

/// Contact and delivery details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Full name.
    pub name: String,
    /// Where the order confirmation goes.
    pub email: Email,
    /// Contact number for delivery.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// Delivery city.
    pub city: String,
    /// Delivery country, as typed by the customer.
    pub country: String,
    /// Free-text delivery instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Customer {
    /// Check that every required free-text field has content.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutValidationError::MissingField`] naming the first
    /// blank field.
    pub fn validate(&self) -> Result<(), CheckoutValidationError> {
        let required = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// One frozen line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product or variant ordered.
    pub item: ItemRef,
    /// Display name at the time of ordering.
    pub name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Price of one unit, frozen at checkout.
    pub unit_price: Decimal,
    /// `unit_price` times `quantity`.
    pub line_total: Decimal,
}

impl OrderLine {
    /// Freeze a line at `unit_price`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutValidationError::AmountOutOfRange`] when the line
    /// total overflows.
    pub fn new(
        item: ItemRef,
        name: String,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<Self, CheckoutValidationError> {
        let Some(line_total) = unit_price.checked_mul(Decimal::from(quantity)) else {
            return Err(CheckoutValidationError::AmountOutOfRange(name));
        };
        Ok(Self {
            item,
            name,
            quantity,
            unit_price,
            line_total,
        })
    }
}

/// Sum of every line total.
fn sum_lines(lines: &[OrderLine]) -> Result<Decimal, CheckoutValidationError> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        total
            .checked_add(line.line_total)
            .ok_or_else(|| CheckoutValidationError::AmountOutOfRange("order total".to_string()))
    })
}

/// Everything needed to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    /// Currency the customer saw while checking out.
    pub currency: CurrencyCode,
    pub payment_method: PaymentMethod,
    /// Country used to pick regional prices, if one was known.
    pub pricing_country: Option<CountryCode>,
    /// Reused across retries of the same checkout so only one order is made.
    pub idempotency_key: Uuid,
}

/// Freeze `cart` into an order submission.
///
/// Each line's unit price is resolved for `location` now and copied into
/// the submission.
///
/// # Errors
///
/// Fails when the cart is empty, the customer is incomplete, or a line
/// resolves to a zero price.
pub fn build_order_payload(
    cart: &CartLedger,
    customer: Customer,
    payment_method: PaymentMethod,
    location: Option<&LocationInfo>,
    currency: CurrencyCode,
    idempotency_key: Uuid,
) -> Result<OrderSubmission, CheckoutValidationError> {
    if cart.is_empty() {
        return Err(CheckoutValidationError::EmptyCart);
    }
    customer.validate()?;

    let lines = cart
        .lines()
        .iter()
        .map(|line| {
            let unit_price = line.unit_price(location);
            if unit_price.is_zero() {
                return Err(CheckoutValidationError::Unpriced(line.item().name.clone()));
            }
            OrderLine::new(
                line.item().item,
                line.item().name.clone(),
                line.quantity(),
                unit_price,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = sum_lines(&lines)?;

    Ok(OrderSubmission {
        customer,
        lines,
        total,
        currency,
        payment_method,
        pricing_country: location.map(|l| l.country_code.clone()),
        idempotency_key,
    })
}

impl OrderSubmission {
    /// Build a submission from lines priced by the client.
    ///
    /// The client's `submitted_total` must equal the sum of its lines.
    ///
    /// # Errors
    ///
    /// Fails on an empty list, a quantity outside `1..=MAX_LINE_QUANTITY`,
    /// a zero price, an incomplete customer, or a total that does not add
    /// up or does not fit in a decimal.
    pub fn from_priced_lines(
        customer: Customer,
        lines: Vec<OrderLine>,
        submitted_total: Decimal,
        currency: CurrencyCode,
        payment_method: PaymentMethod,
        idempotency_key: Uuid,
    ) -> Result<Self, CheckoutValidationError> {
        if lines.is_empty() {
            return Err(CheckoutValidationError::EmptyCart);
        }
        customer.validate()?;
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(CheckoutValidationError::InvalidQuantity(line.name.clone()));
        }
        if let Some(line) = lines.iter().find(|l| l.quantity > MAX_LINE_QUANTITY) {
            return Err(CheckoutValidationError::QuantityExceedsLimit {
                item: line.name.clone(),
                quantity: u64::from(line.quantity),
            });
        }
        if let Some(line) = lines.iter().find(|l| l.unit_price <= Decimal::ZERO) {
            return Err(CheckoutValidationError::Unpriced(line.name.clone()));
        }

        let computed = sum_lines(&lines)?;
        if computed != submitted_total {
            return Err(CheckoutValidationError::TotalMismatch {
                submitted: submitted_total,
                computed,
            });
        }

        Ok(Self {
            customer,
            lines,
            total: computed,
            currency,
            payment_method,
            pricing_country: None,
            idempotency_key,
        })
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub pricing_country: Option<CountryCode>,
    pub idempotency_key: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a submission as a new pending order.
    #[must_use]
    pub fn from_submission(id: OrderId, submission: OrderSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer: submission.customer,
            lines: submission.lines,
            total: submission.total,
            currency: submission.currency,
            payment_method: submission.payment_method,
            status: OrderStatus::Pending,
            pricing_country: submission.pricing_country,
            idempotency_key: submission.idempotency_key,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Percentage change from `previous` to `current`, to one decimal place.
///
/// `None` when there is no previous period to compare against.
#[must_use]
pub fn growth_rate(current: u64, previous: u64) -> Option<Decimal> {
    if previous == 0 {
        return None;
    }
    let current = Decimal::from(current);
    let previous = Decimal::from(previous);
    Some(((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(1))
}

/// Admin overview figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Revenue from orders that were not cancelled, per currency.
    pub revenue: BTreeMap<CurrencyCode, Decimal>,
    pub orders_this_month: u64,
    pub orders_last_month: u64,
    /// Month-over-month order growth in percent.
    pub growth_rate: Option<Decimal>,
}

impl OrderStats {
    /// Summarize `orders` relative to the calendar month containing `now`.
    #[must_use]
    pub fn compute(orders: &[Order], now: DateTime<Utc>) -> Self {
        let this_month = month_start(now);
        let last_month = this_month.and_then(|start| start.checked_sub_months(Months::new(1)));

        let mut stats = Self {
            total_orders: 0,
            by_status: OrderStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_owned(), 0))
                .collect(),
            revenue: BTreeMap::new(),
            orders_this_month: 0,
            orders_last_month: 0,
            growth_rate: None,
        };

        for order in orders {
            stats.total_orders += 1;
            *stats
                .by_status
                .entry(order.status.as_str().to_owned())
                .or_default() += 1;

            if order.status != OrderStatus::Cancelled {
                *stats.revenue.entry(order.currency).or_default() += order.total;
            }

            match (this_month, last_month) {
                (Some(this), _) if order.created_at >= this => stats.orders_this_month += 1,
                (Some(this), Some(last)) if order.created_at >= last && order.created_at < this => {
                    stats.orders_last_month += 1;
                }
                _ => {}
            }
        }

        stats.growth_rate = growth_rate(stats.orders_this_month, stats.orders_last_month);
        stats
    }
}

fn month_start(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    at.date_naive()
        .with_day(1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::CartItem;
    use crate::catalog::fixtures::product;

    fn customer() -> Customer {
        Customer {
            name: "Ama Mensah".into(),
            email: Email::parse("ama@example.com").unwrap(),
            phone: "+233200000000".into(),
            address: "12 Ring Road".into(),
            city: "Accra".into(),
            country: "Ghana".into(),
            notes: None,
        }
    }

    fn at(code: &str) -> LocationInfo {
        LocationInfo::from_country(CountryCode::parse(code).unwrap())
    }

    #[test]
    fn test_payload_freezes_resolved_prices() {
        let mut p = product(1, 100);
        p.price_ghs = Some(Decimal::from(1_300));
        let mut cart = CartLedger::new();
        cart.add(CartItem::from_product(&p), 2).unwrap();
        cart.add(CartItem::from_product(&product(2, 40)), 1).unwrap();

        let key = Uuid::new_v4();
        let payload = build_order_payload(
            &cart,
            customer(),
            PaymentMethod::MobileMoney,
            Some(&at("GH")),
            CurrencyCode::GHS,
            key,
        )
        .unwrap();

        assert_eq!(payload.lines.len(), 2);
        assert_eq!(payload.lines[0].unit_price, Decimal::from(1_300));
        assert_eq!(payload.lines[0].line_total, Decimal::from(2_600));
        assert_eq!(payload.total, Decimal::from(2_640));
        assert_eq!(payload.pricing_country.unwrap().as_str(), "GH");
        assert_eq!(payload.idempotency_key, key);
    }

    #[test]
    fn test_payload_is_unaffected_by_later_cart_changes() {
        let mut cart = CartLedger::new();
        let item = CartItem::from_product(&product(1, 100));
        cart.add(item.clone(), 1).unwrap();

        let payload = build_order_payload(
            &cart,
            customer(),
            PaymentMethod::Card,
            None,
            CurrencyCode::USD,
            Uuid::new_v4(),
        )
        .unwrap();

        let mut repriced = item;
        repriced.price = Some(Decimal::from(250));
        cart.add(repriced, 1).unwrap();

        assert_eq!(payload.lines[0].unit_price, Decimal::from(100));
        assert_eq!(payload.total, Decimal::from(100));
        assert_eq!(cart.total(None), Decimal::from(500));
    }

    #[test]
    fn test_payload_rejects_empty_cart() {
        let err = build_order_payload(
            &CartLedger::new(),
            customer(),
            PaymentMethod::Card,
            None,
            CurrencyCode::USD,
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert_eq!(err, CheckoutValidationError::EmptyCart);
    }

    #[test]
    fn test_payload_rejects_unpriced_items() {
        let mut p = product(1, 0);
        p.price = None;
        let mut cart = CartLedger::new();
        cart.add(CartItem::from_product(&p), 1).unwrap();

        let err = build_order_payload(
            &cart,
            customer(),
            PaymentMethod::Card,
            None,
            CurrencyCode::USD,
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutValidationError::Unpriced(_)));
    }

    #[test]
    fn test_customer_requires_fields() {
        let mut c = customer();
        c.phone = "  ".into();
        assert_eq!(c.validate(), Err(CheckoutValidationError::MissingField("phone")));
    }

    #[test]
    fn test_priced_lines_must_add_up() {
        let item = ItemRef::Product {
            product_id: crate::types::ProductId::new(1),
        };
        let lines = vec![OrderLine::new(item, "Shea butter".into(), 3, Decimal::from(20)).unwrap()];

        let ok = OrderSubmission::from_priced_lines(
            customer(),
            lines.clone(),
            Decimal::from(60),
            CurrencyCode::USD,
            PaymentMethod::BankTransfer,
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(ok.total, Decimal::from(60));

        let err = OrderSubmission::from_priced_lines(
            customer(),
            lines,
            Decimal::from(50),
            CurrencyCode::USD,
            PaymentMethod::BankTransfer,
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutValidationError::TotalMismatch { .. }));
    }

    #[test]
    fn test_priced_lines_reject_overflow() {
        let item = ItemRef::Product {
            product_id: crate::types::ProductId::new(1),
        };
        let err = OrderLine::new(item, "Gold".into(), 2, Decimal::MAX).unwrap_err();
        assert_eq!(err, CheckoutValidationError::AmountOutOfRange("Gold".into()));

        let half = OrderLine::new(item, "Gold".into(), 1, Decimal::MAX).unwrap();
        let err = OrderSubmission::from_priced_lines(
            customer(),
            vec![half.clone(), half],
            Decimal::ONE,
            CurrencyCode::USD,
            PaymentMethod::Card,
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutValidationError::AmountOutOfRange(_)));
    }

    #[test]
    fn test_priced_lines_respect_quantity_limit() {
        let item = ItemRef::Product {
            product_id: crate::types::ProductId::new(1),
        };
        let line = OrderLine::new(item, "Shea butter".into(), MAX_LINE_QUANTITY + 1, Decimal::ONE)
            .unwrap();
        let err = OrderSubmission::from_priced_lines(
            customer(),
            vec![line],
            Decimal::from(MAX_LINE_QUANTITY + 1),
            CurrencyCode::USD,
            PaymentMethod::Card,
            Uuid::new_v4(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CheckoutValidationError::QuantityExceedsLimit { quantity: 1000, .. }
        ));
    }

    #[test]
    fn test_growth_rate() {
        assert_eq!(growth_rate(15, 10), Some(Decimal::from(50)));
        assert_eq!(growth_rate(5, 10), Some(Decimal::from(-50)));
        assert_eq!(growth_rate(1, 3), Some(Decimal::new(-667, 1)));
        assert_eq!(growth_rate(4, 0), None);
    }

    #[test]
    fn test_stats_by_month_and_status() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let submission = |total: i64| OrderSubmission {
            customer: customer(),
            lines: Vec::new(),
            total: Decimal::from(total),
            currency: CurrencyCode::NGN,
            payment_method: PaymentMethod::Card,
            pricing_country: None,
            idempotency_key: Uuid::new_v4(),
        };
        let order = |id: i32, total: i64, created: DateTime<Utc>, status: OrderStatus| {
            let mut o = Order::from_submission(OrderId::new(id), submission(total), created);
            o.status = status;
            o
        };

        let orders = vec![
            order(1, 100, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(), OrderStatus::Pending),
            order(2, 200, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(), OrderStatus::Cancelled),
            order(3, 300, Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap(), OrderStatus::Delivered),
            order(4, 400, Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(), OrderStatus::Shipped),
        ];

        let stats = OrderStats::compute(&orders, now);
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.orders_this_month, 2);
        assert_eq!(stats.orders_last_month, 1);
        assert_eq!(stats.growth_rate, Some(Decimal::from(100)));
        assert_eq!(stats.by_status["cancelled"], 1);
        assert_eq!(stats.by_status["processing"], 0);
        assert_eq!(stats.revenue[&CurrencyCode::NGN], Decimal::from(800));
    }
}
