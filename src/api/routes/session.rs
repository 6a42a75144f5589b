//! Session token endpoints
//!
//! The login handshake runs outside the gateway; its results are posted here
//! and kept in the credential store.

use super::{error_response, ApiError};
use crate::api::server::AppState;
use crate::error::GatewayError;
use crate::services::token_store::{ACCESS_TOKEN, SID, SUB, TRADE_TOKEN};
use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens produced by an external login flow
#[derive(Debug, Deserialize)]
pub struct TokenIngestRequest {
    pub access_token: Option<String>,
    pub sid: Option<String>,
    pub sub: Option<String>,
    pub trade_token: Option<String>,
    /// Lifetime in seconds; one hour when absent
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenIngestResponse {
    pub stored: Vec<&'static str>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One credential without its value
#[derive(Debug, Serialize)]
pub struct SessionEntry {
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub fresh: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub credentials: Vec<SessionEntry>,
}

pub async fn ingest_tokens(
    State(state): State<AppState>,
    Json(req): Json<TokenIngestRequest>,
) -> Result<Json<TokenIngestResponse>, ApiError> {
    let expires_at = match req.expires_in.filter(|secs| *secs > 0) {
        Some(secs) => Some(
            Duration::try_seconds(secs)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .ok_or_else(|| {
                    error_response(GatewayError::InvalidRequest(format!(
                        "expires_in out of range: {}",
                        secs
                    )))
                })?,
        ),
        None => None,
    };

    let provided = [
        (ACCESS_TOKEN, req.access_token),
        (SID, req.sid),
        (SUB, req.sub),
        (TRADE_TOKEN, req.trade_token),
    ];

    let mut stored = Vec::new();
    for (name, value) in provided {
        let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
            continue;
        };
        state.store.set(name, value, expires_at).await;
        stored.push(name);
    }

    if stored.is_empty() {
        return Err(error_response(GatewayError::InvalidRequest(
            "no tokens provided".to_string(),
        )));
    }

    Ok(Json(TokenIngestResponse { stored, expires_at }))
}

/// Redacted view of the credential store
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let now = Utc::now();
    let mut credentials: Vec<SessionEntry> = state
        .store
        .snapshot()
        .await
        .into_iter()
        .map(|(name, credential)| SessionEntry {
            fresh: credential.is_fresh_at(now),
            expires_at: credential.expires_at,
            name,
        })
        .collect();
    credentials.sort_by(|a, b| a.name.cmp(&b.name));
    Json(SessionResponse { credentials })
}
