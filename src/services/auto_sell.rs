//! Auto-sell controller
//!
//! Polls open positions on a fixed interval and places a LIMIT SELL for each
//! one at `average_buy_price + threshold_delta`. Configuration is shared with
//! the HTTP surface and picked up on the next iteration. Any error inside an
//! iteration is counted and logged; the loop only ends on its stop signal.

use super::broker::Brokerage;
use super::metrics::Metrics;
use crate::config::AutoSellSettings;
use crate::error::Result;
use crate::types::{OrderIntent, Position};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// Runtime auto-sell settings. A write replaces the whole value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSellConfig {
    #[serde(alias = "y")]
    pub threshold_delta: f64,
    pub enabled: bool,
}

impl From<&AutoSellSettings> for AutoSellConfig {
    fn from(settings: &AutoSellSettings) -> Self {
        Self {
            threshold_delta: settings.threshold_delta,
            enabled: settings.enabled,
        }
    }
}

/// What one iteration did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationOutcome {
    pub positions: usize,
    pub submitted: usize,
    pub failed: usize,
}

/// Limit price for a position: average buy price plus the markup, at two decimals
pub fn target_sell_price(average_buy_price: f64, threshold_delta: f64) -> Option<f64> {
    let avg = Decimal::try_from(average_buy_price).ok()?;
    let delta = Decimal::try_from(threshold_delta).ok()?;
    (avg + delta).round_dp(2).to_f64()
}

/// Cheap, cloneable access to a running controller
#[derive(Clone)]
pub struct AutoSellHandle {
    config: Arc<RwLock<AutoSellConfig>>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl AutoSellHandle {
    pub async fn current(&self) -> AutoSellConfig {
        *self.config.read().await
    }

    /// Replace the configuration; the loop sees it on its next iteration
    pub async fn update(&self, config: AutoSellConfig) {
        *self.config.write().await = config;
        info!(
            "[Auto-Sell] Config updated: enabled={} delta={}",
            config.enabled, config.threshold_delta
        );
    }

    /// Ask the loop to exit. Safe to call more than once.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

pub struct AutoSellController {
    broker: Arc<dyn Brokerage>,
    config: Arc<RwLock<AutoSellConfig>>,
    interval: Duration,
    metrics: Metrics,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl AutoSellController {
    pub fn new(
        broker: Arc<dyn Brokerage>,
        config: AutoSellConfig,
        interval: Duration,
        metrics: Metrics,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            broker,
            config: Arc::new(RwLock::new(config)),
            interval,
            metrics,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn handle(&self) -> AutoSellHandle {
        AutoSellHandle {
            config: self.config.clone(),
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Run until stopped
    pub async fn run(mut self) {
        info!("[Auto-Sell] Controller started (interval {:?})", self.interval);

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.stop_rx.changed() => {}
            }
        }

        info!("[Auto-Sell] Controller stopped");
    }

    /// One iteration with every failure absorbed
    async fn tick(&self) {
        self.metrics.inc_auto_sell_iterations();
        match self.run_iteration().await {
            Ok(outcome) if outcome.positions > 0 => {
                debug!(
                    "[Auto-Sell] Iteration done: {} positions, {} submitted, {} failed",
                    outcome.positions, outcome.submitted, outcome.failed
                );
            }
            Ok(_) => {}
            Err(e) => {
                self.metrics.record_loop_failure(e.kind());
                warn!("[Auto-Sell] Iteration failed: {}", e);
            }
        }
    }

    /// Fetch positions and submit one sell per position.
    /// A rejected order is counted and the remaining positions still go out.
    pub async fn run_iteration(&self) -> Result<IterationOutcome> {
        let config = *self.config.read().await;
        if !config.enabled {
            return Ok(IterationOutcome::default());
        }

        let positions = self.broker.fetch_positions().await?;
        let mut outcome = IterationOutcome {
            positions: positions.len(),
            ..Default::default()
        };

        for position in &positions {
            let Some(intent) = sell_intent(position, config.threshold_delta) else {
                continue;
            };

            match self.broker.place_order(&intent).await {
                Ok(ack) => {
                    outcome.submitted += 1;
                    self.metrics.inc_auto_sell_orders();
                    info!(
                        "[Auto-Sell] SELL {} x{} @ {:.2} -> order {}",
                        intent.symbol,
                        intent.quantity,
                        intent.price.unwrap_or_default(),
                        ack.order_id
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    self.metrics.record_loop_failure(e.kind());
                    warn!("[Auto-Sell] SELL {} failed: {}", intent.symbol, e);
                }
            }
        }

        Ok(outcome)
    }
}

fn sell_intent(position: &Position, threshold_delta: f64) -> Option<OrderIntent> {
    if position.quantity <= 0 {
        return None;
    }
    let price = target_sell_price(position.average_buy_price, threshold_delta)?;
    Some(OrderIntent::limit_sell(&position.symbol, position.quantity, price))
}
