//! In-memory credential store for brokerage session tokens
//!
//! Tokens produced by the (external) login handshake are kept here with an
//! expiry. Expired entries are never purged; they simply read as absent.
//! The whole table sits behind one mutex so a token refresh and an outbound
//! call never see a half-written entry.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Session access token (bearer)
pub const ACCESS_TOKEN: &str = "access_token";
/// Session id returned by login validation
pub const SID: &str = "sid";
/// Subject / user id returned by login validation
pub const SUB: &str = "sub";
/// Trade token sent as the `Auth` header on session-scoped endpoints
pub const TRADE_TOKEN: &str = "trade_token";

/// Lifetime applied when the producer does not supply an expiry
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// A named token with its expiry
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Thread-safe store for session credentials
#[derive(Clone, Default)]
pub struct CredentialStore {
    tokens: Arc<Mutex<HashMap<String, Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Store or overwrite a credential. Without an expiry it lives for one hour.
    pub async fn set(&self, name: &str, value: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let expires_at = expires_at.unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_TTL_SECS));
        let mut tokens = self.tokens.lock().await;
        tokens.insert(
            name.to_string(),
            Credential {
                value: value.into(),
                expires_at,
            },
        );
        debug!("[TokenStore] Stored {} (expires {})", name, expires_at);
    }

    /// Get a credential's value if it exists and has not expired
    pub async fn get(&self, name: &str) -> Option<String> {
        let tokens = self.tokens.lock().await;
        let now = Utc::now();
        tokens
            .get(name)
            .filter(|c| c.is_fresh_at(now))
            .map(|c| c.value.clone())
    }

    /// Copy of every entry, expired ones included. Diagnostics only.
    pub async fn snapshot(&self) -> HashMap<String, Credential> {
        self.tokens.lock().await.clone()
    }
}
