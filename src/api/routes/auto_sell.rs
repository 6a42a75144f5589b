//! Auto-sell configuration endpoints

use super::{error_response, ApiError};
use crate::api::server::AppState;
use crate::error::GatewayError;
use crate::services::AutoSellConfig;
use axum::{extract::State, Json};
use serde_json::Value;

pub async fn get_config(State(state): State<AppState>) -> Json<AutoSellConfig> {
    Json(state.auto_sell.current().await)
}

/// Replace the auto-sell configuration wholesale
pub async fn set_config(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AutoSellConfig>, ApiError> {
    let config: AutoSellConfig = serde_json::from_value(body)
        .map_err(|e| error_response(GatewayError::InvalidRequest(e.to_string())))?;
    if !config.threshold_delta.is_finite() {
        return Err(error_response(GatewayError::InvalidRequest(
            "thresholdDelta must be a finite number".to_string(),
        )));
    }

    state.auto_sell.update(config).await;
    Ok(Json(config))
}
