//! Axum server setup and configuration

use crate::api::routes;
use crate::services::{
    AuthResolver, AutoSellConfig, AutoSellController, AutoSellHandle, BrokerClient, CredentialStore, Metrics,
};
use crate::Config;
use anyhow::Result;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Session tokens from the external login flow
    pub store: CredentialStore,
    pub broker: Arc<BrokerClient>,
    /// Control of the background auto-sell loop
    pub auto_sell: AutoSellHandle,
    pub metrics: Metrics,
}

impl AppState {
    /// Wire the gateway together. The returned controller is not running yet;
    /// the caller decides where to spawn it.
    pub fn new(config: Config) -> Result<(Self, AutoSellController)> {
        let metrics = Metrics::new();
        let store = CredentialStore::new();

        let auth = AuthResolver::new(
            config.broker.auth_mode,
            config.broker.credentials.clone(),
            config.broker.neo_fin_key.clone(),
            store.clone(),
        );
        let broker = Arc::new(BrokerClient::new(&config.broker, auth, metrics.clone())?);

        let controller = AutoSellController::new(
            broker.clone(),
            AutoSellConfig::from(&config.auto_sell),
            config.auto_sell.poll_interval,
            metrics.clone(),
        );

        let state = Self {
            config: Arc::new(config),
            store,
            broker,
            auto_sell: controller.handle(),
            metrics,
        };
        Ok((state, controller))
    }
}

/// Create the Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Account
        .route("/funds", get(routes::account::get_funds))
        .route("/profit", get(routes::account::get_profit))
        .route("/expenses", get(routes::account::get_expenses))
        .route("/user/limits", post(routes::account::user_limits))
        .route("/check-margin", post(routes::account::check_margin))
        .route("/positions", get(routes::account::list_positions))
        // Orders
        .route("/orders/open", get(routes::orders::list_open_orders))
        .route("/orders/place", post(routes::orders::place_order))
        .route("/close_positions", post(routes::orders::close_positions))
        // Auto-sell
        .route(
            "/auto_sell/config",
            get(routes::auto_sell::get_config).post(routes::auto_sell::set_config),
        )
        // Session tokens
        .route("/session/tokens", post(routes::session::ingest_tokens))
        .route("/session", get(routes::session::get_session))
        // Diagnostics
        .route("/__probe/env-clean", get(routes::probe::env_clean))
        .route("/__probe/funds", get(routes::probe::funds_reachability))
        .route("/__probe/funds-auth", get(routes::probe::funds_auth))
        .route("/__probe/metrics", get(routes::probe::metrics));

    Router::new()
        .nest("/api", api_routes)
        .route("/", get(root))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Broker gateway is running" }))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
