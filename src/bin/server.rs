//! Broker Gateway Web Server
//!
//! HTTP control surface plus the background auto-sell worker.

use anyhow::Result;
use broker_gateway::api::{create_app, AppState};
use broker_gateway::Config;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Default to info for the gateway, warn for everything else.
    // Override with RUST_LOG, e.g. RUST_LOG=debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,broker_gateway=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let config = Config::from_env()?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       BROKER GATEWAY - WEB SERVER                            ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Broker: {:<51} ║", truncate(&config.broker.base_url, 51));
    println!("║  Auth Mode: {:<48} ║", config.broker.auth_mode.as_str());
    println!(
        "║  Auto-Sell: {:<48} ║",
        if config.auto_sell.enabled {
            format!("ENABLED (+{})", config.auto_sell.threshold_delta)
        } else {
            "DISABLED".to_string()
        }
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    if !config.has_static_credential() {
        warn!(
            "No static credential for auth mode {}; broker calls fail until one is provided",
            config.broker.auth_mode
        );
    }

    // Create application state
    info!("Initializing application state...");
    let port = config.server_port;
    let (state, controller) = AppState::new(config)?;
    let auto_sell = state.auto_sell.clone();

    // Spawn the auto-sell worker; it idles while disabled
    let worker = tokio::spawn(async move {
        info!("Starting auto-sell controller...");
        controller.run().await;
    });

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    info!("  Health: http://{}/health", addr);
    info!("  API: http://{}/api", addr);

    // Run the server until Ctrl-C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down auto-sell controller...");
    auto_sell.stop();
    if let Err(e) = worker.await {
        warn!("Auto-sell task ended abnormally: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
