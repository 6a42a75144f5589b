//! API route handlers

pub mod account;
pub mod auto_sell;
pub mod orders;
pub mod probe;
pub mod session;

use crate::error::GatewayError;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a gateway error onto its HTTP status with a `{"error": ...}` body
pub fn error_response(err: GatewayError) -> ApiError {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    if status.is_server_error() {
        warn!("[API] {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
