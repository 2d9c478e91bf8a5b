//! Admin order management.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use oja_core::{Order, OrderId, OrderStats, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Status change.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: OrderStatus,
}

/// All orders, newest first.
pub async fn list(_admin: RequireAdmin, State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list().await?))
}

/// Order counts, revenue, and month-over-month growth.
pub async fn stats(_admin: RequireAdmin, State(state): State<AppState>) -> Result<Json<OrderStats>> {
    let orders = state.orders().list().await?;
    Ok(Json(OrderStats::compute(&orders, Utc::now())))
}

/// One order.
pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;
    Ok(Json(order))
}

/// Move an order to a new status. Closed orders cannot be reopened.
#[instrument(skip(_admin, state, payload))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    payload: std::result::Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(request) = payload?;
    let current = state
        .orders()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    let next = current.status.transition_to(request.status)?;
    let order = state.orders().update_status(id, next).await?;

    tracing::info!(order_id = %id, from = %current.status, to = %next, "Order status updated");
    Ok(Json(order))
}

/// Delete an order.
#[instrument(skip(_admin, state))]
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    state.orders().delete(id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
