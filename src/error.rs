//! Broker gateway error types
//!
//! Every outbound call resolves to a domain value or one of these errors.
//! Route handlers map them to HTTP status codes; the auto-sell loop counts
//! them by [`ErrorKind`] and keeps going.

use serde_json::Value;
use thiserror::Error;

/// Longest payload excerpt kept in a shape error
const MAX_PAYLOAD_EXCERPT: usize = 500;

/// Errors surfaced by the gateway core
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Required credential missing or auth mode unrecognized
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Brokerage answered with a non-success status
    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Expected field absent from every known response location
    #[error("unexpected {what} payload: {payload}")]
    Shape { what: &'static str, payload: String },

    /// Request exceeded the configured timeout
    #[error("request to broker timed out")]
    Timeout,

    /// Network/connection failure before a response arrived
    #[error("request to broker failed: {0}")]
    Transport(String),

    /// Caller input could not be normalized
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Fieldless discriminant of [`GatewayError`], used for per-kind counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Upstream,
    Shape,
    Timeout,
    Transport,
    InvalidRequest,
}

impl GatewayError {
    /// Build a shape error from the payload that failed to match
    pub fn shape(what: &'static str, payload: &Value) -> Self {
        let mut payload = payload.to_string();
        if payload.len() > MAX_PAYLOAD_EXCERPT {
            let cut = (0..=MAX_PAYLOAD_EXCERPT)
                .rev()
                .find(|i| payload.is_char_boundary(*i))
                .unwrap_or(0);
            payload.truncate(cut);
            payload.push_str("...");
        }
        GatewayError::Shape { what, payload }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Configuration(_) => ErrorKind::Configuration,
            GatewayError::Upstream { .. } => ErrorKind::Upstream,
            GatewayError::Shape { .. } => ErrorKind::Shape,
            GatewayError::Timeout => ErrorKind::Timeout,
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status a request handler should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::Configuration(_) | GatewayError::Shape { .. } => 500,
            GatewayError::Upstream { status, .. } if (100..=599).contains(status) => *status,
            GatewayError::Upstream { .. } | GatewayError::Transport(_) => 502,
            GatewayError::Timeout => 504,
            GatewayError::InvalidRequest(_) => 400,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_connect() {
            GatewayError::Transport(format!("connection failed: {}", err))
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Best-effort message from an error body: `message`, then `error`, then
/// `errors`, else the whole payload.
pub fn upstream_message(body: &Value) -> String {
    ["message", "error", "errors"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.to_string())
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upstream_message_prefers_message_field() {
        let body = json!({"error": "bad", "message": "Session expired"});
        assert_eq!(upstream_message(&body), "Session expired");
    }

    #[test]
    fn test_upstream_message_falls_back_to_errors_then_body() {
        let body = json!({"errors": [{"code": "E1"}]});
        assert_eq!(upstream_message(&body), r#"[{"code":"E1"}]"#);

        let body = json!({"stat": "Not_Ok"});
        assert_eq!(upstream_message(&body), r#"{"stat":"Not_Ok"}"#);
    }

    #[test]
    fn test_http_status_mapping() {
        let err = GatewayError::Upstream { status: 401, message: "nope".into() };
        assert_eq!(err.http_status(), 401);
        assert_eq!(GatewayError::Timeout.http_status(), 504);
        assert_eq!(GatewayError::Configuration("x".into()).http_status(), 500);
        assert_eq!(GatewayError::InvalidRequest("x".into()).http_status(), 400);
        let weird = GatewayError::Upstream { status: 42, message: String::new() };
        assert_eq!(weird.http_status(), 502);
    }

    #[test]
    fn test_shape_error_truncates_long_payload() {
        let payload = json!({"blob": "x".repeat(2000)});
        match GatewayError::shape("funds", &payload) {
            GatewayError::Shape { what, payload } => {
                assert_eq!(what, "funds");
                assert!(payload.len() <= MAX_PAYLOAD_EXCERPT + 3);
                assert!(payload.ends_with("..."));
            }
            other => panic!("expected shape error, got {:?}", other),
        }
    }
}
