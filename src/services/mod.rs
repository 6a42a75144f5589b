//! Brokerage-facing services

pub mod auth;
pub mod auto_sell;
pub mod broker;
pub mod extract;
pub mod metrics;
pub mod token_store;

pub use auth::{AuthAttempt, AuthResolver};
pub use auto_sell::{AutoSellConfig, AutoSellController, AutoSellHandle, IterationOutcome};
pub use broker::{BrokerClient, Brokerage, ProbeReport, ProbeResult, ReachabilityReport};
pub use metrics::{Metrics, MetricsSnapshot};
pub use token_store::{Credential, CredentialStore};
