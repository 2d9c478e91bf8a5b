//! Currencies and display formatting.
//!
//! Amounts are `rust_decimal::Decimal` in the currency's standard unit
//! (naira, cedis, dollars). Formatting never looks at the visitor's location:
//! the caller always names the currency explicitly.

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 codes the storefront can display.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CurrencyCode {
    /// Nigerian naira.
    NGN,
    /// Ghanaian cedi.
    GHS,
    /// US dollar.
    #[default]
    USD,
}

impl CurrencyCode {
    /// All supported currencies, in display order.
    pub const ALL: [Self; 3] = [Self::NGN, Self::GHS, Self::USD];

    /// The currency symbol used in front of amounts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NGN => "\u{20a6}",
            Self::GHS => "\u{20b5}",
            Self::USD => "$",
        }
    }

    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::GHS => "GHS",
            Self::USD => "USD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a currency code is not supported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Self::NGN),
            "GHS" => Ok(Self::GHS),
            "USD" => Ok(Self::USD),
            _ => Err(UnknownCurrency(s.to_owned())),
        }
    }
}

/// An amount paired with the currency it should be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.amount, self.currency_code))
    }
}

/// Format an amount for display, e.g. `₦45,000.00` or `-$1,234.50`.
///
/// Rounds half away from zero to two decimal places and groups the integer
/// part in thousands with commas. All three supported currencies share the
/// en-NG / en-GH / en-US separators.
#[must_use]
pub fn format_amount(amount: Decimal, currency: CurrencyCode) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!(
        "{sign}{}{}.{fraction}",
        currency.symbol(),
        group_thousands(whole)
    )
}

fn group_thousands(whole: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_symbols() {
        let amount = Decimal::from(45_000);
        assert_eq!(format_amount(amount, CurrencyCode::NGN), "\u{20a6}45,000.00");
        assert_eq!(format_amount(amount, CurrencyCode::GHS), "\u{20b5}45,000.00");
        assert_eq!(format_amount(amount, CurrencyCode::USD), "$45,000.00");
    }

    #[test]
    fn test_format_grouping() {
        assert_eq!(format_amount(Decimal::ZERO, CurrencyCode::USD), "$0.00");
        assert_eq!(format_amount(Decimal::from(999), CurrencyCode::USD), "$999.00");
        assert_eq!(format_amount(Decimal::from(1000), CurrencyCode::USD), "$1,000.00");
        assert_eq!(
            format_amount(Decimal::from(1_234_567), CurrencyCode::USD),
            "$1,234,567.00"
        );
    }

    #[test]
    fn test_format_rounding() {
        assert_eq!(format_amount(Decimal::new(19_995, 3), CurrencyCode::USD), "$20.00");
        assert_eq!(format_amount(Decimal::new(1_994, 3), CurrencyCode::USD), "$1.99");
        assert_eq!(format_amount(Decimal::new(5, 1), CurrencyCode::USD), "$0.50");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(
            format_amount(Decimal::new(-123_450, 2), CurrencyCode::NGN),
            "-\u{20a6}1,234.50"
        );
        assert_eq!(format_amount(Decimal::new(-1, 3), CurrencyCode::USD), "$0.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("ngn".parse::<CurrencyCode>().unwrap(), CurrencyCode::NGN);
        assert_eq!(" GHS ".parse::<CurrencyCode>().unwrap(), CurrencyCode::GHS);
        assert!("EUR".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(Decimal::new(2_500_050, 2), CurrencyCode::GHS);
        assert_eq!(price.to_string(), "\u{20b5}25,000.50");
    }
}
