//! Metrics collection for monitoring gateway and auto-sell health

use crate::error::ErrorKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Collected metrics for the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Outbound brokerage calls
    pub api_calls_total: u64,
    pub api_errors_total: u64,
    /// Orders placed through the gateway, any origin
    pub orders_submitted: u64,
    pub orders_failed: u64,
    /// Auto-sell loop activity
    pub auto_sell_iterations: u64,
    pub auto_sell_orders: u64,
    /// Failures absorbed by the auto-sell loop, by kind
    pub auto_sell_failures: LoopFailures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopFailures {
    pub configuration: u64,
    pub upstream: u64,
    pub shape: u64,
    pub timeout: u64,
    pub transport: u64,
    pub invalid_request: u64,
}

impl LoopFailures {
    pub fn total(&self) -> u64 {
        self.configuration + self.upstream + self.shape + self.timeout + self.transport + self.invalid_request
    }
}

/// Thread-safe metrics collector
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    api_calls_total: AtomicU64,
    api_errors_total: AtomicU64,
    orders_submitted: AtomicU64,
    orders_failed: AtomicU64,
    auto_sell_iterations: AtomicU64,
    auto_sell_orders: AtomicU64,
    loop_configuration: AtomicU64,
    loop_upstream: AtomicU64,
    loop_shape: AtomicU64,
    loop_timeout: AtomicU64,
    loop_transport: AtomicU64,
    loop_invalid_request: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_api_calls(&self) {
        self.inner.api_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_api_errors(&self) {
        self.inner.api_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_submitted(&self) {
        self.inner.orders_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_failed(&self) {
        self.inner.orders_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_auto_sell_iterations(&self) {
        self.inner.auto_sell_iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_auto_sell_orders(&self) {
        self.inner.auto_sell_orders.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failure the auto-sell loop swallowed
    pub fn record_loop_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::Configuration => &self.inner.loop_configuration,
            ErrorKind::Upstream => &self.inner.loop_upstream,
            ErrorKind::Shape => &self.inner.loop_shape,
            ErrorKind::Timeout => &self.inner.loop_timeout,
            ErrorKind::Transport => &self.inner.loop_transport,
            ErrorKind::InvalidRequest => &self.inner.loop_invalid_request,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let inner = &self.inner;
        MetricsSnapshot {
            api_calls_total: load(&inner.api_calls_total),
            api_errors_total: load(&inner.api_errors_total),
            orders_submitted: load(&inner.orders_submitted),
            orders_failed: load(&inner.orders_failed),
            auto_sell_iterations: load(&inner.auto_sell_iterations),
            auto_sell_orders: load(&inner.auto_sell_orders),
            auto_sell_failures: LoopFailures {
                configuration: load(&inner.loop_configuration),
                upstream: load(&inner.loop_upstream),
                shape: load(&inner.loop_shape),
                timeout: load(&inner.loop_timeout),
                transport: load(&inner.loop_transport),
                invalid_request: load(&inner.loop_invalid_request),
            },
        }
    }
}
