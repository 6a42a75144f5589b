//! Diagnostic endpoints. None of them change state.

use crate::api::server::AppState;
use crate::services::{MetricsSnapshot, ProbeReport, ReachabilityReport};
use axum::{extract::State, Json};
use serde::Serialize;

/// Presence and length of a configured secret, never its value
#[derive(Debug, Serialize)]
pub struct SecretShape {
    pub present: bool,
    pub length: usize,
}

impl SecretShape {
    fn of(value: &str) -> Self {
        Self {
            present: !value.is_empty(),
            length: value.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnvReport {
    pub base_url: String,
    pub auth_mode: &'static str,
    pub api_key: SecretShape,
    pub access_token: SecretShape,
    pub internal_key: SecretShape,
    pub client_code: SecretShape,
}

pub async fn env_clean(State(state): State<AppState>) -> Json<EnvReport> {
    let broker = &state.config.broker;
    let creds = &broker.credentials;
    Json(EnvReport {
        base_url: broker.base_url.clone(),
        auth_mode: broker.auth_mode.as_str(),
        api_key: SecretShape::of(&creds.api_key),
        access_token: SecretShape::of(&creds.access_token),
        internal_key: SecretShape::of(&creds.internal_key),
        client_code: SecretShape::of(&creds.client_code),
    })
}

/// Unauthenticated status of the base URL and funds path
pub async fn funds_reachability(State(state): State<AppState>) -> Json<ReachabilityReport> {
    Json(state.broker.probe_reachability().await)
}

/// Try every auth scheme against the funds endpoint
pub async fn funds_auth(State(state): State<AppState>) -> Json<ProbeReport> {
    Json(state.broker.probe_auth().await)
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
