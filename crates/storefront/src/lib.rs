//! Oja Storefront library.
//!
//! This crate provides the storefront API as a library, allowing the router
//! to be tested against in-memory repositories and reused by the binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the application router with sessions, request ids, and tracing.
///
/// Sentry layers are added by the binary, outermost.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    routes::routes()
        .layer(sessions)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(trace)
        .with_state(state)
}
