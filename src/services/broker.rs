//! Brokerage REST client
//!
//! Single point of outbound communication. Every response is normalized into
//! a domain value or a [`GatewayError`]; callers never see raw status codes.

use super::auth::AuthResolver;
use super::extract::{
    first_match, first_number, first_string, FUNDS_STRATEGIES, LIST_STRATEGIES, ORDER_ID_STRATEGIES,
    PROFIT_STRATEGIES,
};
use super::metrics::Metrics;
use crate::config::{BrokerConfig, BrokerPaths, FundsMethod};
use crate::error::{upstream_message, GatewayError, Result};
use crate::types::{Expenses, LimitsQuery, MarginRequest, OrderAck, OrderIntent, Position};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Characters of a non-JSON body kept in a probe sample
const PROBE_SAMPLE_CHARS: usize = 120;

/// Operations the auto-sell controller needs from the brokerage
#[async_trait]
pub trait Brokerage: Send + Sync {
    async fn fetch_positions(&self) -> Result<Vec<Position>>;
    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck>;
}

/// Outcome of one auth attempt during a probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub mode: String,
    pub status: Option<u16>,
    pub sample_body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub results: Vec<ProbeResult>,
}

/// Status codes seen by the unauthenticated reachability check
#[derive(Debug, Clone, Serialize)]
pub struct ReachabilityReport {
    pub base: String,
    pub base_status: Option<u16>,
    pub funds_path: String,
    #[serde(rename = "funds_status_POST")]
    pub funds_status_post: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// REST client for the brokerage API
pub struct BrokerClient {
    client: Client,
    base_url: String,
    paths: BrokerPaths,
    funds_method: FundsMethod,
    auth: AuthResolver,
    metrics: Metrics,
}

impl BrokerClient {
    pub fn new(config: &BrokerConfig, auth: AuthResolver, metrics: Metrics) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            paths: config.paths.clone(),
            funds_method: config.funds_method,
            auth,
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and normalize the response, counting the call
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        self.metrics.inc_api_calls();
        let result = match request.send().await {
            Ok(response) => read_response(response).await,
            Err(e) => Err(GatewayError::from(e)),
        };
        if let Err(e) = &result {
            self.metrics.inc_api_errors();
            debug!("[Broker] Call failed: {}", e);
        }
        result
    }

    /// Available cash
    pub async fn fetch_funds(&self) -> Result<f64> {
        let headers = self.auth.headers().await?;
        let url = self.url(&self.paths.funds);
        let request = match self.funds_method {
            FundsMethod::Post => self.client.post(url).headers(headers).json(&json!({})),
            FundsMethod::Get => self.client.get(url).headers(headers),
        };
        let payload = self.send(request).await?;
        first_match(&payload, FUNDS_STRATEGIES).ok_or_else(|| GatewayError::shape("funds", &payload))
    }

    /// Open positions. Rows without a symbol, quantity and average price are dropped.
    pub async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let headers = self.auth.headers().await?;
        let payload = self
            .send(self.client.get(self.url(&self.paths.positions)).headers(headers))
            .await?;

        let rows = first_match(&payload, LIST_STRATEGIES).unwrap_or_default();
        let positions: Vec<Position> = rows.iter().filter_map(Position::from_row).collect();
        if positions.len() < rows.len() {
            debug!(
                "[Broker] Skipped {} unresolvable position rows",
                rows.len() - positions.len()
            );
        }
        Ok(positions)
    }

    /// Order book, optionally filtered by status
    pub async fn fetch_orders(&self, status: Option<&str>) -> Result<Vec<Value>> {
        let headers = self.auth.headers().await?;
        let mut request = self.client.get(self.url(&self.paths.orders)).headers(headers);
        if let Some(status) = status {
            request = request.query(&[("status", status)]);
        }
        let payload = self.send(request).await?;
        Ok(first_match(&payload, LIST_STRATEGIES).unwrap_or_default())
    }

    /// Open orders via the dedicated path when the tenant has one
    pub async fn fetch_open_orders(&self) -> Result<Vec<Value>> {
        match &self.paths.orders_open {
            Some(path) => {
                let headers = self.auth.headers().await?;
                let payload = self.send(self.client.get(self.url(path)).headers(headers)).await?;
                Ok(first_match(&payload, LIST_STRATEGIES).unwrap_or_default())
            }
            None => self.fetch_orders(Some("OPEN")).await,
        }
    }

    pub async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck> {
        let headers = self.auth.headers().await?;
        info!(
            "[Broker] Placing {} {} x{} ({}{})",
            intent.transaction_type,
            intent.symbol,
            intent.quantity,
            intent.order_type,
            intent.price.map(|p| format!(" @ {:.2}", p)).unwrap_or_default()
        );

        let result = self
            .send(self.client.post(self.url(&self.paths.place_order)).headers(headers).json(intent))
            .await
            .and_then(|payload| order_ack(&payload));

        match &result {
            Ok(ack) => {
                self.metrics.inc_orders_submitted();
                info!("[Broker] Order {} accepted ({})", ack.order_id, ack.status);
            }
            Err(e) => {
                self.metrics.inc_orders_failed();
                warn!("[Broker] Order for {} failed: {}", intent.symbol, e);
            }
        }
        result
    }

    /// Square off everything. `Ok(false)` when the tenant has no close-all endpoint.
    pub async fn close_all_positions(&self) -> Result<bool> {
        let Some(path) = &self.paths.close_all else {
            return Ok(false);
        };
        let headers = self.auth.headers().await?;
        self.send(self.client.post(self.url(path)).headers(headers)).await?;
        info!("[Broker] Close-all submitted");
        Ok(true)
    }

    /// Day profit, `0.0` when no P&L endpoint is configured
    pub async fn fetch_day_profit(&self) -> Result<f64> {
        let Some(path) = &self.paths.pnl else {
            return Ok(0.0);
        };
        let headers = self.auth.headers().await?;
        let payload = self.send(self.client.get(self.url(path)).headers(headers)).await?;
        first_match(&payload, PROFIT_STRATEGIES).ok_or_else(|| GatewayError::shape("profit", &payload))
    }

    /// Day charges, all zero when no expenses endpoint is configured
    pub async fn fetch_day_expenses(&self) -> Result<Expenses> {
        let Some(path) = &self.paths.expenses else {
            return Ok(Expenses::default());
        };
        let headers = self.auth.headers().await?;
        let payload = self.send(self.client.get(self.url(path)).headers(headers)).await?;

        let field = |name: &str| {
            first_number(&payload, &[name])
                .or_else(|| payload.get("data").and_then(|d| first_number(d, &[name])))
                .unwrap_or(0.0)
        };
        Ok(Expenses::new(field("brokerage"), field("taxes"), field("other")))
    }

    /// Session-scoped limits call
    pub async fn fetch_user_limits(&self, query: &LimitsQuery) -> Result<Value> {
        self.post_session_form(&self.paths.user_limits, &[], query).await
    }

    /// Pre-trade margin check against the given server id
    pub async fn check_margin(&self, request: &MarginRequest, server_id: &str) -> Result<Value> {
        self.post_session_form(&self.paths.check_margin, &[("sId", server_id)], request)
            .await
    }

    /// Form-encoded call with the JSON payload embedded as a string in `jData`
    async fn post_session_form<T: Serialize>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        payload: &T,
    ) -> Result<Value> {
        let headers = self.auth.session_headers().await?;
        let jdata = serde_json::to_string(payload)
            .map_err(|e| GatewayError::InvalidRequest(format!("unencodable jData payload: {}", e)))?;

        let mut request = self.client.post(self.url(path)).headers(headers);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request.form(&[("jData", jdata)])).await
    }

    /// Unauthenticated reachability check: GET on the base URL and an empty
    /// POST on the funds path. Only status codes are reported.
    pub async fn probe_reachability(&self) -> ReachabilityReport {
        let funds_url = self.url(&self.paths.funds);
        let (root, funds) = tokio::join!(
            self.client.get(self.url("/")).send(),
            self.client.post(&funds_url).json(&json!({})).send(),
        );

        let mut errors = Vec::new();
        let mut status = |result: reqwest::Result<Response>| match result {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                errors.push(GatewayError::from(e).to_string());
                None
            }
        };
        let base_status = status(root);
        let funds_status_post = status(funds);

        ReachabilityReport {
            base: self.base_url.clone(),
            base_status,
            funds_path: self.paths.funds.clone(),
            funds_status_post,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    /// Try every viable auth scheme against the funds endpoint. Read-only.
    pub async fn probe_auth(&self) -> ProbeReport {
        let url = self.url(&self.paths.funds);
        let attempts = self.auth.attempts().await;

        let results = join_all(attempts.into_iter().map(|attempt| {
            let mode = attempt.mode.to_string();
            let request = self.client.post(&url).headers(attempt.headers).json(&json!({}));
            async move {
                match request.send().await {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        let text = response.text().await.unwrap_or_default();
                        ProbeResult {
                            mode,
                            status: Some(status),
                            sample_body: sample_body(&text),
                            error: None,
                        }
                    }
                    Err(e) => ProbeResult {
                        mode,
                        status: None,
                        sample_body: Value::Null,
                        error: Some(GatewayError::from(e).to_string()),
                    },
                }
            }
        }))
        .await;

        ProbeReport { url, results }
    }
}

#[async_trait]
impl Brokerage for BrokerClient {
    async fn fetch_positions(&self) -> Result<Vec<Position>> {
        BrokerClient::fetch_positions(self).await
    }

    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck> {
        BrokerClient::place_order(self, intent).await
    }
}

/// Turn a raw response into JSON or a domain error
async fn read_response(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if text.trim().is_empty() {
        return if status.is_success() {
            Ok(Value::Null)
        } else {
            Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("empty response").to_string(),
            })
        };
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(body) if status.is_success() => Ok(body),
        Ok(body) => Err(GatewayError::Upstream {
            status: status.as_u16(),
            message: upstream_message(&body),
        }),
        Err(_) if status.is_success() => Err(GatewayError::shape("response", &Value::String(text))),
        Err(_) => Err(GatewayError::Upstream {
            status: status.as_u16(),
            message: text,
        }),
    }
}

fn order_ack(payload: &Value) -> Result<OrderAck> {
    let order_id =
        first_match(payload, ORDER_ID_STRATEGIES).ok_or_else(|| GatewayError::shape("order", payload))?;
    let status = first_string(payload, &["status", "stat"])
        .or_else(|| payload.get("data").and_then(|d| first_string(d, &["status", "stat"])))
        .unwrap_or_else(|| "UNKNOWN".to_string());
    Ok(OrderAck { order_id, status })
}

/// Compact excerpt of a probe response: first two keys of an object,
/// otherwise the start of the text
fn sample_body(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Value::Object(map.into_iter().take(2).collect()),
        Ok(other) => other,
        Err(_) => Value::String(text.chars().take(PROBE_SAMPLE_CHARS).collect()),
    }
}
