//! The cart ledger.
//!
//! [`CartLedger`] is the single source of truth for what a visitor has
//! selected. Only the lines are stored; `total` and `item_count` are
//! computed from them on every read, so there is no cached figure that can
//! drift after a quantity or location change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CartItem, ItemRef};
use crate::pricing::resolve_price;
use crate::types::LocationInfo;

/// Maximum quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Errors raised by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity to add must be at least one.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    /// Resulting line quantity would exceed [`MAX_LINE_QUANTITY`].
    #[error("quantity {0} exceeds the limit of {MAX_LINE_QUANTITY} per item")]
    QuantityExceedsLimit(u64),
}

/// One entity and how many of it the visitor wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    item: CartItem,
    quantity: u32,
}

impl CartLine {
    /// The entity snapshot.
    #[must_use]
    pub const fn item(&self) -> &CartItem {
        &self.item
    }

    /// Always at least one.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price for `location`.
    #[must_use]
    pub fn unit_price(&self, location: Option<&LocationInfo>) -> Decimal {
        resolve_price(&self.item, location)
    }

    /// Unit price times quantity for `location`.
    #[must_use]
    pub fn line_total(&self, location: Option<&LocationInfo>) -> Decimal {
        self.unit_price(location) * Decimal::from(self.quantity)
    }
}

/// Ordered list of cart lines, unique by [`ItemRef`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of `item`, merging into an existing line for the same
    /// entity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when `quantity <= 0` and
    /// [`CartError::QuantityExceedsLimit`] when the line would exceed
    /// [`MAX_LINE_QUANTITY`]. The cart is unchanged on error.
    pub fn add(&mut self, item: CartItem, quantity: i64) -> Result<(), CartError> {
        let quantity = positive_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.item.item == item.item) {
            line.quantity = capped(u64::from(line.quantity) + u64::from(quantity))?;
            line.item = item;
            return Ok(());
        }

        let quantity = capped(u64::from(quantity))?;
        self.lines.push(CartLine { item, quantity });
        Ok(())
    }

    /// Replace the quantity of an existing line. Zero or below removes it.
    ///
    /// Setting the quantity of an entity not in the cart does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityExceedsLimit`] for quantities above
    /// [`MAX_LINE_QUANTITY`].
    pub fn set_quantity(&mut self, item: &ItemRef, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            self.remove(item);
            return Ok(());
        }

        let quantity = capped(quantity.unsigned_abs())?;
        if let Some(line) = self.lines.iter_mut().find(|l| &l.item.item == item) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove the line for `item`. Removing an absent line is a no-op.
    pub fn remove(&mut self, item: &ItemRef) {
        self.lines.retain(|l| &l.item.item != item);
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Whether `item` already has a line.
    #[must_use]
    pub fn is_in_cart(&self, item: &ItemRef) -> bool {
        self.lines.iter().any(|l| &l.item.item == item)
    }

    /// The current lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of line totals, resolved for `location`.
    #[must_use]
    pub fn total(&self, location: Option<&LocationInfo>) -> Decimal {
        self.lines.iter().map(|l| l.line_total(location)).sum()
    }
}

impl From<Vec<CartLine>> for CartLedger {
    /// Rebuild a ledger from stored lines, dropping anything that breaks the
    /// ledger's invariants (zero quantities, duplicates).
    fn from(stored: Vec<CartLine>) -> Self {
        let mut ledger = Self::new();
        for line in stored {
            if line.quantity == 0 || ledger.is_in_cart(&line.item.item) {
                continue;
            }
            ledger.lines.push(CartLine {
                quantity: line.quantity.min(MAX_LINE_QUANTITY),
                item: line.item,
            });
        }
        ledger
    }
}

impl From<CartLedger> for Vec<CartLine> {
    fn from(ledger: CartLedger) -> Self {
        ledger.lines
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    u32::try_from(quantity).map_err(|_| CartError::QuantityExceedsLimit(quantity.unsigned_abs()))
}

fn capped(quantity: u64) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(q) if q <= MAX_LINE_QUANTITY => Ok(q),
        _ => Err(CartError::QuantityExceedsLimit(quantity)),
    }
}
