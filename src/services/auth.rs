//! Outbound authentication headers
//!
//! Turns the configured [`AuthMode`] plus static and stored credentials into
//! the header set for one brokerage call.

use super::token_store::{CredentialStore, ACCESS_TOKEN, SID, TRADE_TOKEN};
use crate::config::{AuthMode, StaticCredentials};
use crate::error::{GatewayError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

const APIKEY: HeaderName = HeaderName::from_static("apikey");
const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const INTERNAL_KEY: HeaderName = HeaderName::from_static("internal-key");
const CLIENT_CODE: HeaderName = HeaderName::from_static("x-client-code");
const SESSION_ID: HeaderName = HeaderName::from_static("sid");
const SESSION_AUTH: HeaderName = HeaderName::from_static("auth");
const NEO_FIN_KEY: HeaderName = HeaderName::from_static("neo-fin-key");

/// One candidate header set for the auth probe
#[derive(Debug, Clone)]
pub struct AuthAttempt {
    pub mode: &'static str,
    pub headers: HeaderMap,
}

/// Resolves auth headers for outbound calls
#[derive(Clone)]
pub struct AuthResolver {
    mode: AuthMode,
    credentials: StaticCredentials,
    neo_fin_key: String,
    store: CredentialStore,
}

impl AuthResolver {
    pub fn new(
        mode: AuthMode,
        credentials: StaticCredentials,
        neo_fin_key: impl Into<String>,
        store: CredentialStore,
    ) -> Self {
        Self {
            mode,
            credentials,
            neo_fin_key: neo_fin_key.into(),
            store,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Headers for a regular JSON call under the configured mode
    pub async fn headers(&self) -> Result<HeaderMap> {
        let mut headers = json_headers();

        match self.mode {
            AuthMode::ApiKey => {
                let key = require(&self.credentials.api_key, "BROKER_API_KEY", self.mode)?;
                headers.insert(APIKEY, header_value(key)?);
            }
            AuthMode::Bearer => {
                let token = self.bearer_token().await;
                let token = require(&token, "BROKER_ACCESS_TOKEN", self.mode)?;
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
            AuthMode::InternalKey => {
                let key = require(&self.credentials.internal_key, "BROKER_INTERNAL_KEY", self.mode)?;
                headers.insert(INTERNAL_KEY, header_value(key)?);
            }
        }

        self.append_client_code(&mut headers)?;
        Ok(headers)
    }

    /// Headers for the session-scoped (form-encoded) endpoint family.
    /// Requires a stored session id and trade token.
    pub async fn session_headers(&self) -> Result<HeaderMap> {
        let sid = self.store.get(SID).await.unwrap_or_default();
        let trade_token = self.store.get(TRADE_TOKEN).await.unwrap_or_default();
        let sid = require(&sid, "session id (sid)", self.mode)?;
        let trade_token = require(&trade_token, "trade token", self.mode)?;
        let bearer = self.bearer_token().await;
        let bearer = require(&bearer, "BROKER_ACCESS_TOKEN", self.mode)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(SESSION_ID, header_value(sid)?);
        headers.insert(SESSION_AUTH, header_value(trade_token)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        headers.insert(NEO_FIN_KEY, header_value(&self.neo_fin_key)?);
        self.append_client_code(&mut headers)?;
        Ok(headers)
    }

    /// Every header set that could work with the credentials currently held,
    /// in probe order. Empty when nothing is configured.
    pub async fn attempts(&self) -> Vec<AuthAttempt> {
        let mut attempts = Vec::new();

        let token = self.bearer_token().await;
        if !token.is_empty() {
            attempts.push(("bearer", AUTHORIZATION, format!("Bearer {}", token)));
        }
        if !self.credentials.api_key.is_empty() {
            attempts.push(("apikey", APIKEY, self.credentials.api_key.clone()));
            attempts.push(("x-api-key", X_API_KEY, self.credentials.api_key.clone()));
        }
        if !self.credentials.internal_key.is_empty() {
            attempts.push(("Internal-Key", INTERNAL_KEY, self.credentials.internal_key.clone()));
        }

        attempts
            .into_iter()
            .filter_map(|(mode, name, value)| {
                let mut headers = json_headers();
                headers.insert(name, HeaderValue::from_str(&value).ok()?);
                self.append_client_code(&mut headers).ok()?;
                Some(AuthAttempt { mode, headers })
            })
            .collect()
    }

    /// Stored session token first, static token as fallback
    async fn bearer_token(&self) -> String {
        match self.store.get(ACCESS_TOKEN).await {
            Some(token) if !token.is_empty() => token,
            _ => self.credentials.access_token.clone(),
        }
    }

    fn append_client_code(&self, headers: &mut HeaderMap) -> Result<()> {
        if !self.credentials.client_code.is_empty() {
            headers.insert(CLIENT_CODE, header_value(&self.credentials.client_code)?);
        }
        Ok(())
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn require<'a>(value: &'a str, what: &str, mode: AuthMode) -> Result<&'a str> {
    if value.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "{} not set but auth mode is {}",
            what, mode
        )));
    }
    Ok(value)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Configuration("credential contains characters not allowed in a header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> StaticCredentials {
        StaticCredentials {
            api_key: "key-1".into(),
            access_token: "static-token".into(),
            internal_key: "internal-1".into(),
            client_code: String::new(),
        }
    }

    fn resolver(mode: AuthMode, credentials: StaticCredentials) -> AuthResolver {
        AuthResolver::new(mode, credentials, "neotradeapi", CredentialStore::new())
    }

    fn has_mode_header(headers: &HeaderMap, name: &HeaderName) -> bool {
        headers.contains_key(name)
    }

    #[tokio::test]
    async fn test_only_selected_mode_header_is_emitted() {
        let cases = [
            (AuthMode::ApiKey, APIKEY),
            (AuthMode::Bearer, AUTHORIZATION),
            (AuthMode::InternalKey, INTERNAL_KEY),
        ];
        for (mode, expected) in cases {
            let headers = resolver(mode, creds()).headers().await.unwrap();
            for other in [APIKEY, AUTHORIZATION, INTERNAL_KEY] {
                assert_eq!(
                    has_mode_header(&headers, &other),
                    other == expected,
                    "mode {} header {}",
                    mode,
                    other
                );
            }
            assert_eq!(headers[ACCEPT], "application/json");
        }
    }

    #[tokio::test]
    async fn test_header_values() {
        let headers = resolver(AuthMode::ApiKey, creds()).headers().await.unwrap();
        assert_eq!(headers[APIKEY], "key-1");

        let headers = resolver(AuthMode::Bearer, creds()).headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer static-token");

        let headers = resolver(AuthMode::InternalKey, creds()).headers().await.unwrap();
        assert_eq!(headers["Internal-Key"], "internal-1");
    }

    #[tokio::test]
    async fn test_empty_required_credential_is_configuration_error() {
        let cases = [
            (AuthMode::ApiKey, StaticCredentials { api_key: String::new(), ..creds() }),
            (AuthMode::Bearer, StaticCredentials { access_token: String::new(), ..creds() }),
            (AuthMode::InternalKey, StaticCredentials { internal_key: String::new(), ..creds() }),
        ];
        for (mode, credentials) in cases {
            let err = resolver(mode, credentials).headers().await.unwrap_err();
            assert!(matches!(err, GatewayError::Configuration(_)), "mode {}", mode);
        }

        // Other modes' credentials missing is fine
        let only_api = StaticCredentials { api_key: "k".into(), ..Default::default() };
        assert!(resolver(AuthMode::ApiKey, only_api).headers().await.is_ok());
    }

    #[tokio::test]
    async fn test_stored_access_token_wins_over_static() {
        let store = CredentialStore::new();
        store.set(ACCESS_TOKEN, "session-token", None).await;
        let resolver = AuthResolver::new(AuthMode::Bearer, creds(), "neotradeapi", store);
        let headers = resolver.headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer session-token");
    }

    #[tokio::test]
    async fn test_bearer_from_store_without_static_token() {
        let store = CredentialStore::new();
        let resolver = AuthResolver::new(AuthMode::Bearer, StaticCredentials::default(), "neotradeapi", store.clone());
        assert!(resolver.headers().await.is_err());

        store.set(ACCESS_TOKEN, "late-token", None).await;
        assert!(resolver.headers().await.is_ok());
    }

    #[tokio::test]
    async fn test_client_code_appended_in_every_mode() {
        for mode in [AuthMode::ApiKey, AuthMode::Bearer, AuthMode::InternalKey] {
            let credentials = StaticCredentials { client_code: "Y1P0E".into(), ..creds() };
            let headers = resolver(mode, credentials).headers().await.unwrap();
            assert_eq!(headers[CLIENT_CODE], "Y1P0E");
        }
        let headers = resolver(AuthMode::ApiKey, creds()).headers().await.unwrap();
        assert!(!headers.contains_key(CLIENT_CODE));
    }

    #[tokio::test]
    async fn test_attempts_follow_present_credentials() {
        let credentials = StaticCredentials { client_code: "C1".into(), ..creds() };
        let attempts = resolver(AuthMode::Bearer, credentials).attempts().await;
        let modes: Vec<&str> = attempts.iter().map(|a| a.mode).collect();
        assert_eq!(modes, vec!["bearer", "apikey", "x-api-key", "Internal-Key"]);
        assert!(attempts.iter().all(|a| a.headers[CLIENT_CODE] == "C1"));
        assert_eq!(attempts[2].headers[X_API_KEY], "key-1");

        let only_internal = StaticCredentials { internal_key: "i".into(), ..Default::default() };
        let attempts = resolver(AuthMode::ApiKey, only_internal).attempts().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].mode, "Internal-Key");

        assert!(resolver(AuthMode::ApiKey, StaticCredentials::default()).attempts().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_headers_require_session_tokens() {
        let store = CredentialStore::new();
        let resolver = AuthResolver::new(AuthMode::ApiKey, creds(), "neotradeapi", store.clone());
        assert!(matches!(
            resolver.session_headers().await,
            Err(GatewayError::Configuration(_))
        ));

        store.set(SID, "sid-9", None).await;
        store.set(TRADE_TOKEN, "trade-9", None).await;
        let headers = resolver.session_headers().await.unwrap();
        assert_eq!(headers["Sid"], "sid-9");
        assert_eq!(headers["Auth"], "trade-9");
        assert_eq!(headers[AUTHORIZATION], "Bearer static-token");
        assert_eq!(headers[NEO_FIN_KEY], "neotradeapi");
    }
}
