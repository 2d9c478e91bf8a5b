//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON with at least an `error` message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use oja_core::{CartError, OrderStatusError};

use crate::db::RepositoryError;
use crate::services::checkout::OrderSubmissionError;
use crate::services::geolocation::DetectionError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart mutation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout could not produce an order.
    #[error("Checkout error: {0}")]
    Checkout(#[from] OrderSubmissionError),

    /// Location lookup failed.
    #[error("Location detection failed: {0}")]
    Detection(#[from] DetectionError),

    /// Order status change not allowed.
    #[error("{0}")]
    Status(#[from] OrderStatusError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Status(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Cart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Checkout(err) => {
                if err.is_retryable() {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            }
            Self::Detection(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound | RepositoryError::Conflict(_)) => false,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Checkout(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if let Self::Detection(err) = &self {
            tracing::warn!(error = %err, "Location detection failed");
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Database(RepositoryError::NotFound) => json!({ "error": "Not found" }),
            Self::Database(RepositoryError::Conflict(msg)) => json!({ "error": msg }),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                json!({ "error": "Internal server error" })
            }
            Self::Checkout(err) => {
                let message = if err.is_retryable() {
                    "Order could not be placed, please try again".to_string()
                } else {
                    err.to_string()
                };
                json!({ "error": message, "retryable": err.is_retryable() })
            }
            Self::Detection(err) => json!({
                "error": "Could not detect your location",
                "reason": err.to_string(),
                "fallback": "manual",
            }),
            Self::Cart(err) => json!({ "error": err.to_string() }),
            Self::Status(err) => json!({ "error": err.to_string() }),
            Self::NotFound(what) => json!({ "error": format!("{what} not found") }),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => json!({ "error": msg }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for visitor actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
