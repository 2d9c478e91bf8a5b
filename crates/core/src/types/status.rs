//! Status and method enums for orders.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An admin tried to reopen or re-close a finished order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot change order status from {from} to {to}")]
pub struct OrderStatusError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Order lifecycle status.
///
/// Orders are created as `Pending` and moved along by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Delivered and cancelled orders are closed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// Open orders may move to any status (admins correct mistakes by
    /// stepping back). Closed orders only accept their own status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return self as u8 == next as u8;
        }
        true
    }

    /// Check a transition, returning the new status when it is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStatusError`] when `self` is closed and `next` differs.
    pub const fn transition_to(self, next: Self) -> Result<Self, OrderStatusError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrderStatusError {
                from: self,
                to: next,
            })
        }
    }

    /// The `snake_case` name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
    MobileMoney,
}
