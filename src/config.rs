//! Configuration management for the broker gateway

use crate::error::GatewayError;
use anyhow::Result;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Gateway configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Brokerage connection settings
    pub broker: BrokerConfig,

    /// Auto-sell defaults applied at startup
    pub auto_sell: AutoSellSettings,

    /// Port for the HTTP control surface
    pub server_port: u16,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL including context and version (e.g. `.../Orders/2.0`)
    pub base_url: String,
    pub auth_mode: AuthMode,
    pub credentials: StaticCredentials,
    pub paths: BrokerPaths,
    pub funds_method: FundsMethod,
    /// Value sent as `neo-fin-key` on session-scoped endpoints
    pub neo_fin_key: String,
    pub request_timeout: Duration,
}

/// Credentials configured at startup. Debug output is redacted.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    pub api_key: String,
    pub access_token: String,
    pub internal_key: String,
    pub client_code: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("StaticCredentials")
            .field("api_key", &redact(&self.api_key))
            .field("access_token", &redact(&self.access_token))
            .field("internal_key", &redact(&self.internal_key))
            .field("client_code", &self.client_code)
            .finish()
    }
}

/// Endpoint paths relative to the base URL. `None` means the tenant does not
/// expose that endpoint.
#[derive(Debug, Clone)]
pub struct BrokerPaths {
    pub funds: String,
    pub positions: String,
    pub orders: String,
    pub orders_open: Option<String>,
    pub place_order: String,
    pub pnl: Option<String>,
    pub expenses: Option<String>,
    pub close_all: Option<String>,
    pub user_limits: String,
    pub check_margin: String,
}

impl Default for BrokerPaths {
    fn default() -> Self {
        Self {
            funds: "/quick/user/limits".to_string(),
            positions: "/portfolio/positions".to_string(),
            orders: "/orders".to_string(),
            orders_open: None,
            place_order: "/quick/order/place".to_string(),
            pnl: None,
            expenses: None,
            close_all: None,
            user_limits: "/quick/user/limits".to_string(),
            check_margin: "/quick/user/check-margin".to_string(),
        }
    }
}

/// Authentication scheme for outbound calls. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey,
    Bearer,
    InternalKey,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ApiKey => "apikey",
            AuthMode::Bearer => "bearer",
            AuthMode::InternalKey => "internal",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apikey" | "api-key" | "api_key" => Ok(AuthMode::ApiKey),
            "bearer" => Ok(AuthMode::Bearer),
            "internal" | "internal-key" | "internal_key" => Ok(AuthMode::InternalKey),
            other => Err(GatewayError::Configuration(format!(
                "unknown auth mode '{}' (expected apikey, bearer or internal)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsMethod {
    Get,
    Post,
}

impl FromStr for FundsMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(FundsMethod::Get),
            "POST" => Ok(FundsMethod::Post),
            other => Err(GatewayError::Configuration(format!(
                "unsupported funds method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoSellSettings {
    /// Markup added to the average buy price (default: 2.0)
    pub threshold_delta: f64,
    /// Whether the worker starts enabled (default: false)
    pub enabled: bool,
    /// Poll interval (default: 5s)
    pub poll_interval: Duration,
}

impl Default for AutoSellSettings {
    fn default() -> Self {
        Self {
            threshold_delta: 2.0,
            enabled: false,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Unset and empty are the same thing for every variable
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = var("BROKER_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("BROKER_BASE_URL is not set"))?;

        let auth_mode: AuthMode = var("BROKER_AUTH_MODE")
            .unwrap_or_else(|| "bearer".to_string())
            .parse()?;

        let funds_method: FundsMethod = var("BROKER_FUNDS_METHOD")
            .unwrap_or_else(|| "GET".to_string())
            .parse()?;

        let credentials = StaticCredentials {
            api_key: var("BROKER_API_KEY").unwrap_or_default(),
            access_token: var("BROKER_ACCESS_TOKEN").unwrap_or_default(),
            internal_key: var("BROKER_INTERNAL_KEY").unwrap_or_default(),
            client_code: var("BROKER_CLIENT_CODE").unwrap_or_default(),
        };

        let defaults = BrokerPaths::default();
        let paths = BrokerPaths {
            funds: var("BROKER_PATH_FUNDS").unwrap_or(defaults.funds),
            positions: var("BROKER_PATH_POSITIONS").unwrap_or(defaults.positions),
            orders: var("BROKER_PATH_ORDERS").unwrap_or(defaults.orders),
            orders_open: var("BROKER_PATH_ORDERS_OPEN"),
            place_order: var("BROKER_PATH_PLACE_ORDER").unwrap_or(defaults.place_order),
            pnl: var("BROKER_PATH_PNL"),
            expenses: var("BROKER_PATH_EXPENSES"),
            close_all: var("BROKER_PATH_CLOSE_ALL"),
            user_limits: var("BROKER_PATH_USER_LIMITS").unwrap_or(defaults.user_limits),
            check_margin: var("BROKER_PATH_CHECK_MARGIN").unwrap_or(defaults.check_margin),
        };

        let request_timeout = var("BROKER_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));

        let neo_fin_key = var("BROKER_NEO_FIN_KEY").unwrap_or_else(|| "neotradeapi".to_string());

        let auto_defaults = AutoSellSettings::default();
        let threshold_delta = match var("AUTO_SELL_THRESHOLD") {
            Some(v) => match v.parse::<f64>() {
                Ok(delta) if delta.is_finite() => delta,
                _ => anyhow::bail!("AUTO_SELL_THRESHOLD must be a finite number, got '{}'", v),
            },
            None => auto_defaults.threshold_delta,
        };
        let auto_sell = AutoSellSettings {
            threshold_delta,
            enabled: var("AUTO_SELL_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(auto_defaults.enabled),
            poll_interval: var("AUTO_SELL_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(auto_defaults.poll_interval),
        };

        let server_port = var("SERVER_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        Ok(Self {
            broker: BrokerConfig {
                base_url,
                auth_mode,
                credentials,
                paths,
                funds_method,
                neo_fin_key,
                request_timeout,
            },
            auto_sell,
            server_port,
        })
    }

    /// Whether the credential required by the selected auth mode was configured.
    /// Bearer tokens may still arrive later through the credential store.
    pub fn has_static_credential(&self) -> bool {
        let creds = &self.broker.credentials;
        match self.broker.auth_mode {
            AuthMode::ApiKey => !creds.api_key.is_empty(),
            AuthMode::Bearer => !creds.access_token.is_empty(),
            AuthMode::InternalKey => !creds.internal_key.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("BROKER_BASE_URL", "https://broker.test/Orders/2.0/")])).unwrap();
        assert_eq!(config.broker.base_url, "https://broker.test/Orders/2.0");
        assert_eq!(config.broker.auth_mode, AuthMode::Bearer);
        assert_eq!(config.broker.funds_method, FundsMethod::Get);
        assert_eq!(config.broker.paths.funds, "/quick/user/limits");
        assert!(config.broker.paths.orders_open.is_none());
        assert!(config.broker.paths.close_all.is_none());
        assert_eq!(config.broker.request_timeout, Duration::from_secs(15));
        assert_eq!(config.auto_sell.poll_interval, Duration::from_secs(5));
        assert!(!config.auto_sell.enabled);
        assert_eq!(config.server_port, 8000);
        assert!(!config.has_static_credential());
    }

    #[test]
    fn test_missing_base_url_fails() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_unknown_auth_mode_fails_at_startup() {
        let result = Config::from_lookup(lookup(&[
            ("BROKER_BASE_URL", "https://broker.test"),
            ("BROKER_AUTH_MODE", "oauth"),
        ]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown auth mode"));
    }

    #[test]
    fn test_auth_mode_spellings() {
        assert_eq!("API-KEY".parse::<AuthMode>().unwrap(), AuthMode::ApiKey);
        assert_eq!("apikey".parse::<AuthMode>().unwrap(), AuthMode::ApiKey);
        assert_eq!(" Bearer ".parse::<AuthMode>().unwrap(), AuthMode::Bearer);
        assert_eq!("internal".parse::<AuthMode>().unwrap(), AuthMode::InternalKey);
        assert_eq!("internal_key".parse::<AuthMode>().unwrap(), AuthMode::InternalKey);
    }

    #[test]
    fn test_empty_optional_paths_are_unconfigured() {
        let config = Config::from_lookup(lookup(&[
            ("BROKER_BASE_URL", "https://broker.test"),
            ("BROKER_PATH_CLOSE_ALL", "  "),
            ("BROKER_PATH_ORDERS_OPEN", "/orders/open"),
            ("BROKER_FUNDS_METHOD", "post"),
            ("BROKER_AUTH_MODE", "apikey"),
            ("BROKER_API_KEY", "k-123"),
            ("AUTO_SELL_ENABLED", "TRUE"),
            ("AUTO_SELL_THRESHOLD", "3.5"),
        ]))
        .unwrap();
        assert!(config.broker.paths.close_all.is_none());
        assert_eq!(config.broker.paths.orders_open.as_deref(), Some("/orders/open"));
        assert_eq!(config.broker.funds_method, FundsMethod::Post);
        assert!(config.auto_sell.enabled);
        assert_eq!(config.auto_sell.threshold_delta, 3.5);
        assert!(config.has_static_credential());
    }

    #[test]
    fn test_non_finite_threshold_fails_at_startup() {
        for bad in ["NaN", "inf", "-inf", "two"] {
            let result = Config::from_lookup(lookup(&[
                ("BROKER_BASE_URL", "https://broker.test"),
                ("AUTO_SELL_THRESHOLD", bad),
            ]));
            let err = result.unwrap_err();
            assert!(err.to_string().contains("AUTO_SELL_THRESHOLD"), "{}", bad);
        }
    }

    #[test]
    fn test_check_margin_path_override() {
        let config = Config::from_lookup(lookup(&[
            ("BROKER_BASE_URL", "https://broker.test"),
            ("BROKER_PATH_CHECK_MARGIN", "/margin"),
        ]))
        .unwrap();
        assert_eq!(config.broker.paths.check_margin, "/margin");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let creds = StaticCredentials {
            api_key: "super-secret".into(),
            client_code: "Y1P0E".into(),
            ..Default::default()
        };
        let out = format!("{:?}", creds);
        assert!(!out.contains("super-secret"));
        assert!(out.contains("[REDACTED]"));
        assert!(out.contains("Y1P0E"));
    }
}
