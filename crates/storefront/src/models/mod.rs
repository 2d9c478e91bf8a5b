//! Storefront models that are not part of the shared domain.
//!
//! - [`detection`] - Location detection ordered across a session's requests
//! - [`pricing`] - Prices resolved and formatted for the current visitor
//! - [`session`] - Visitor state kept in the session
//! - [`settings`] - Site settings document

pub mod detection;
pub mod pricing;
pub mod session;
pub mod settings;

pub use detection::DetectionRegistry;
pub use pricing::{PriceView, PricingContext};
pub use session::keys as session_keys;
pub use settings::{SITE_SETTINGS_KEY, SiteSettings};
