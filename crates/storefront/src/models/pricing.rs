//! Prices as shown to a particular visitor.

use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;

use oja_core::{CurrencyCode, LocationInfo, Price, PricedEntity, resolve_price};

use super::detection::DetectionRegistry;
use super::session::display_currency;
use crate::error::Result;

/// An amount with its display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceView {
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub formatted: String,
}

impl PriceView {
    #[must_use]
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Price::new(amount, currency).into()
    }
}

impl From<Price> for PriceView {
    fn from(price: Price) -> Self {
        Self {
            amount: price.amount,
            currency: price.currency_code,
            formatted: price.to_string(),
        }
    }
}

/// The visitor's location and display currency for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingContext {
    pub location: Option<LocationInfo>,
    pub currency: CurrencyCode,
}

impl PricingContext {
    /// Read the pricing inputs for the visitor behind `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(detections: &DetectionRegistry, session: &Session) -> Result<Self> {
        let location = detections.current(session).await?.location().cloned();
        let currency = display_currency(session, location.as_ref()).await?;
        Ok(Self { location, currency })
    }

    /// The location used for price resolution.
    #[must_use]
    pub const fn location(&self) -> Option<&LocationInfo> {
        self.location.as_ref()
    }

    /// Resolve and format the price of `entity`.
    #[must_use]
    pub fn price<E: PricedEntity + ?Sized>(&self, entity: &E) -> PriceView {
        self.amount(resolve_price(entity, self.location()))
    }

    /// Format an already resolved amount.
    #[must_use]
    pub fn amount(&self, amount: Decimal) -> PriceView {
        PriceView::new(amount, self.currency)
    }
}
