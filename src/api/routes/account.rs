//! Account API endpoints: funds, P&L, charges, limits, positions

use super::{error_response, ApiError};
use crate::api::server::AppState;
use crate::error::GatewayError;
use crate::types::{Expenses, Funds, LimitsQuery, MarginRequest, Position, Profit};
use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Positions response
#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<Position>,
    pub total: usize,
}

pub async fn get_funds(State(state): State<AppState>) -> Result<Json<Funds>, ApiError> {
    let available = state.broker.fetch_funds().await.map_err(error_response)?;
    Ok(Json(Funds { available }))
}

pub async fn get_profit(State(state): State<AppState>) -> Result<Json<Profit>, ApiError> {
    let day_profit = state.broker.fetch_day_profit().await.map_err(error_response)?;
    Ok(Json(Profit { day_profit }))
}

pub async fn get_expenses(State(state): State<AppState>) -> Result<Json<Expenses>, ApiError> {
    let expenses = state.broker.fetch_day_expenses().await.map_err(error_response)?;
    Ok(Json(expenses))
}

/// Session-scoped limits lookup. An empty body uses CASH/NSE/ALL; a body
/// that is present must parse.
pub async fn user_limits(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let query = if body.iter().all(u8::is_ascii_whitespace) {
        LimitsQuery::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| error_response(GatewayError::InvalidRequest(format!("limits query: {}", e))))?
    };
    let limits = state
        .broker
        .fetch_user_limits(&query)
        .await
        .map_err(error_response)?;
    Ok(Json(limits))
}

#[derive(Debug, Deserialize)]
pub struct MarginQuery {
    #[serde(rename = "sId", default = "default_server_id")]
    pub server_id: String,
}

fn default_server_id() -> String {
    "server1".to_string()
}

/// Pre-trade margin check on the session-scoped form endpoint
pub async fn check_margin(
    State(state): State<AppState>,
    Query(query): Query<MarginQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request: MarginRequest = serde_json::from_value(body)
        .map_err(|e| error_response(GatewayError::InvalidRequest(e.to_string())))?;
    let margin = state
        .broker
        .check_margin(&request, &query.server_id)
        .await
        .map_err(error_response)?;
    Ok(Json(margin))
}

pub async fn list_positions(State(state): State<AppState>) -> Result<Json<PositionsResponse>, ApiError> {
    let positions = state.broker.fetch_positions().await.map_err(error_response)?;
    let total = positions.len();
    Ok(Json(PositionsResponse { positions, total }))
}
