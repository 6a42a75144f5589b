//! Broker Gateway CLI
//!
//! One-shot brokerage calls through the same client the server uses.

use anyhow::Result;
use broker_gateway::services::{AuthResolver, BrokerClient, CredentialStore, Metrics, ProbeReport};
use broker_gateway::{Config, Position};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "broker-gateway")]
#[command(about = "Query the brokerage through the gateway client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available cash
    Funds,

    /// List open positions with their auto-sell target
    Positions {
        /// Markup over average buy price used for the target column
        #[arg(short, long)]
        delta: Option<f64>,
    },

    /// List open orders
    OpenOrders {
        /// Print raw JSON rows
        #[arg(long)]
        json: bool,
    },

    /// Try every configured auth scheme against the funds endpoint
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let broker = build_client(&config)?;

    match cli.command {
        Commands::Funds => show_funds(&broker).await?,
        Commands::Positions { delta } => {
            show_positions(&broker, delta.unwrap_or(config.auto_sell.threshold_delta)).await?
        }
        Commands::OpenOrders { json } => show_open_orders(&broker, json).await?,
        Commands::Probe => show_probe(broker.probe_auth().await),
    }

    Ok(())
}

fn build_client(config: &Config) -> Result<BrokerClient> {
    let auth = AuthResolver::new(
        config.broker.auth_mode,
        config.broker.credentials.clone(),
        config.broker.neo_fin_key.clone(),
        CredentialStore::new(),
    );
    Ok(BrokerClient::new(&config.broker, auth, Metrics::new())?)
}

fn header(title: &str, broker: &BrokerClient) {
    println!("\n{}", "=".repeat(70));
    println!("  {}", title.bold());
    println!("  {}", broker.base_url().dimmed());
    println!("{}\n", "=".repeat(70));
}

async fn show_funds(broker: &BrokerClient) -> Result<()> {
    header("FUNDS", broker);
    let available = broker.fetch_funds().await?;
    println!("  Available: {}", format!("{:.2}", available).green().bold());
    println!();
    Ok(())
}

async fn show_positions(broker: &BrokerClient, delta: f64) -> Result<()> {
    header("POSITIONS", broker);
    let positions = broker.fetch_positions().await?;

    if positions.is_empty() {
        println!("  No open positions.\n");
        return Ok(());
    }

    println!("  {:<24} {:>8} {:>12} {:>12}", "SYMBOL", "QTY", "AVG PRICE", "TARGET");
    println!("  {}", "-".repeat(60));
    for Position { symbol, quantity, average_buy_price } in &positions {
        let target = broker_gateway::services::auto_sell::target_sell_price(*average_buy_price, delta)
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:>8} {:>12.2} {:>12}",
            symbol,
            quantity,
            average_buy_price,
            target.cyan()
        );
    }
    println!("\n  {} positions (target = avg + {})\n", positions.len(), delta);
    Ok(())
}

async fn show_open_orders(broker: &BrokerClient, json: bool) -> Result<()> {
    header("OPEN ORDERS", broker);
    let orders = broker.fetch_open_orders().await?;

    if orders.is_empty() {
        println!("  No open orders.\n");
        return Ok(());
    }

    for order in &orders {
        if json {
            println!("  {}", order);
            continue;
        }
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| order.get(*n).filter(|v| !v.is_null()))
                .map(display)
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<14} {:<20} {:<5} {:>6} @ {:<10} {}",
            field(&["orderId", "order_id", "nOrdNo"]),
            field(&["symbol", "tradingsymbol", "trdSym"]),
            field(&["transactionType", "transaction_type", "trnsTp"]),
            field(&["quantity", "qty"]),
            field(&["price", "prc"]),
            field(&["status", "ordSt"]).yellow()
        );
    }
    println!("\n  {} open orders\n", orders.len());
    Ok(())
}

fn show_probe(report: ProbeReport) {
    println!("\n{}", "=".repeat(70));
    println!("  {}", "AUTH PROBE".bold());
    println!("  {}", report.url.dimmed());
    println!("{}\n", "=".repeat(70));

    if report.results.is_empty() {
        println!("  {}\n", "No credentials configured.".red());
        return;
    }

    for result in &report.results {
        let status = match (result.status, &result.error) {
            (Some(code), _) if (200..300).contains(&code) => code.to_string().green().bold(),
            (Some(code), _) => code.to_string().red(),
            (None, Some(err)) => err.as_str().red(),
            (None, None) => "-".normal(),
        };
        println!("  {:<14} {}", result.mode, status);
        if !result.sample_body.is_null() {
            println!("  {:<14} {}", "", result.sample_body.to_string().dimmed());
        }
    }
    println!();
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
