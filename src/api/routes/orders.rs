//! Order API endpoints

use super::{error_response, ApiError};
use crate::api::server::AppState;
use crate::error::GatewayError;
use crate::types::{OrderAck, OrderRequest};
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Value>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub closed: bool,
}

pub async fn list_open_orders(State(state): State<AppState>) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.broker.fetch_open_orders().await.map_err(error_response)?;
    let total = orders.len();
    Ok(Json(OrdersResponse { orders, total }))
}

/// Place an order. Accepts either `transaction_type` or `side`, and either
/// `quantity` or `qty`.
pub async fn place_order(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<OrderAck>, ApiError> {
    let request: OrderRequest = serde_json::from_value(body)
        .map_err(|e| error_response(GatewayError::InvalidRequest(e.to_string())))?;
    let intent = request.normalize().map_err(error_response)?;

    let ack = state.broker.place_order(&intent).await.map_err(error_response)?;
    Ok(Json(ack))
}

pub async fn close_positions(State(state): State<AppState>) -> Result<Json<CloseResponse>, ApiError> {
    let closed = state
        .broker
        .close_all_positions()
        .await
        .map_err(error_response)?;
    Ok(Json(CloseResponse { closed }))
}
