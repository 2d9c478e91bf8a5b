//! Oja Core - Domain types and pricing logic.
//!
//! This crate provides the business rules shared by every Oja component:
//! - `storefront` - Public storefront API and admin order/settings API
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every operation here is deterministic and can be
//! tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, locations, emails, and statuses
//! - [`pricing`] - Location-aware price resolution
//! - [`catalog`] - Products, variants, categories, and image fallback
//! - [`cart`] - The cart ledger and its derived totals
//! - [`order`] - Customers, order submissions, and order statistics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod pricing;
pub mod types;

pub use cart::{CartError, CartLedger, CartLine, MAX_LINE_QUANTITY};
pub use catalog::{CartItem, Category, ItemRef, Product, ProductVariant, primary_image};
pub use order::{
    CheckoutValidationError, Customer, Order, OrderLine, OrderStats, OrderSubmission,
    build_order_payload, growth_rate,
};
pub use pricing::{PricedEntity, currency_for_location, resolve_price};
pub use types::*;
