//! Core types for Oja.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod location;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use location::{CountryCode, CountryCodeError, DetectionState, DetectionTicket, LocationInfo};
pub use money::{CurrencyCode, Price, UnknownCurrency, format_amount};
pub use status::*;
