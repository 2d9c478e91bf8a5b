//! Location-aware price resolution.
//!
//! Products and variants carry a base `price` plus optional per-country
//! overrides. [`resolve_price`] is the single place that decides which of
//! those fields applies for a visitor; listings, the cart, and checkout all
//! go through it.
//!
//! | Location        | Resolved price                  |
//! |-----------------|---------------------------------|
//! | unknown         | `price`                         |
//! | `NG`            | `price_ngn`, else `price`       |
//! | `GH`            | `price_ghs`, else `price`       |
//! | any other code  | `price`                         |
//!
//! A missing `price` resolves to zero ("unpriced"). Whether zero is
//! purchasable is the caller's decision.

use rust_decimal::Decimal;

use crate::types::{CountryCode, CurrencyCode, LocationInfo};

/// Anything that carries the storefront's price fields.
pub trait PricedEntity {
    /// Base price used when no regional override applies.
    fn base_price(&self) -> Option<Decimal>;
    /// Override for visitors in Nigeria.
    fn price_ngn(&self) -> Option<Decimal>;
    /// Override for visitors in Ghana.
    fn price_ghs(&self) -> Option<Decimal>;
}

impl<T: PricedEntity + ?Sized> PricedEntity for &T {
    fn base_price(&self) -> Option<Decimal> {
        (**self).base_price()
    }

    fn price_ngn(&self) -> Option<Decimal> {
        (**self).price_ngn()
    }

    fn price_ghs(&self) -> Option<Decimal> {
        (**self).price_ghs()
    }
}

/// Resolve the unit price of `entity` for a visitor at `location`.
///
/// Never fails. A regional override that is unset or zero falls back to the
/// base price; a negative stored amount resolves to zero.
#[must_use]
pub fn resolve_price<E: PricedEntity + ?Sized>(entity: &E, location: Option<&LocationInfo>) -> Decimal {
    let regional = location.and_then(|loc| match loc.country_code.as_str() {
        CountryCode::NIGERIA => entity.price_ngn(),
        CountryCode::GHANA => entity.price_ghs(),
        _ => None,
    });

    regional
        .filter(|amount| !amount.is_zero())
        .or_else(|| entity.base_price())
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}

/// The display currency a visitor at `location` starts with.
///
/// Only used to pick a default; an explicit currency choice always wins.
#[must_use]
pub fn currency_for_location(location: Option<&LocationInfo>) -> CurrencyCode {
    match location.map(|loc| loc.country_code.as_str()) {
        Some(CountryCode::NIGERIA) => CurrencyCode::NGN,
        Some(CountryCode::GHANA) => CurrencyCode::GHS,
        _ => CurrencyCode::USD,
    }
}
