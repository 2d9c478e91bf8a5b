//! Stateless checkout.
//!
//! `POST /api/check-out` takes the whole order in the request body, for
//! clients that keep their own cart. An `Idempotency-Key` header makes
//! retries safe; without one every request is a new order.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;
use uuid::Uuid;

use oja_core::Order;

use crate::error::{AppError, Result};
use crate::services::PricedCheckout;
use crate::state::AppState;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

fn idempotency_key(headers: &HeaderMap) -> Result<Uuid> {
    match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => Ok(Uuid::new_v4()),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| AppError::BadRequest("Idempotency-Key must be a UUID".to_string())),
    }
}

/// Create an order from a client-priced item list.
#[instrument(skip_all)]
pub async fn check_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<PricedCheckout>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let key = idempotency_key(&headers)?;
    let Json(request) = payload?;

    let order = state.checkout().checkout_priced(request, key).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        let key = Uuid::new_v4();
        headers.insert(
            IDEMPOTENCY_KEY_HEADER,
            HeaderValue::from_str(&key.to_string()).unwrap(),
        );
        assert_eq!(idempotency_key(&headers).unwrap(), key);

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("abc"));
        assert!(idempotency_key(&headers).is_err());

        assert!(idempotency_key(&HeaderMap::new()).is_ok());
    }
}
