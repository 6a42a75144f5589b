//! Broker Gateway Library
//!
//! Local gateway in front of a retail brokerage REST API:
//!
//! 1. **Credential caching**: session tokens from an external login flow are
//!    held in memory with an expiry and turned into outbound auth headers.
//!
//! 2. **Response normalization**: funds, positions, orders and P&L arrive in
//!    several tenant-specific shapes and are reduced to one domain value each.
//!
//! 3. **Auto-sell**: a background worker places a limit sell above the average
//!    buy price of every open position.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{GatewayError, Result};
pub use services::{AutoSellController, BrokerClient, CredentialStore, Metrics};
pub use types::{OrderAck, OrderIntent, OrderRequest, Position};
