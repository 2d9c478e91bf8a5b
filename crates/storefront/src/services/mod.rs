//! Business logic services.
//!
//! Services sit between route handlers and external systems:
//!
//! - [`geolocation`] - IP geolocation lookups with a per-IP cache
//! - [`checkout`] - Freezing carts into orders in the order store

pub mod checkout;
pub mod geolocation;

pub use checkout::{CheckoutSubmitter, OrderSubmissionError, PricedCheckout, PricedItem};
pub use geolocation::{DetectionError, GeolocationClient};
