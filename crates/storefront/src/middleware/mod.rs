//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Admin authentication and client IP lookup are extractors rather than
//! layers, so only the handlers that need them pay for them.

pub mod admin;
pub mod client_ip;
pub mod request_id;
pub mod session;

pub use admin::RequireAdmin;
pub use client_ip::ClientIp;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer_with_store};
