use std::sync::Arc;
use std::time::Duration;

use common::{models::ApiEnvelope, session::Session};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{error::ApiError, remote::LoginResponse, traits::SessionTeardown};

/// Per-call knobs. Defaults: `GET`, no body, bearer token attached.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Applied after the defaults, so a header here replaces the default one.
    pub headers: HeaderMap,
    pub authenticated: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            query: Vec::new(),
            headers: HeaderMap::new(),
            authenticated: true,
        }
    }
}

impl CallOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// REST client for the trading backend.
///
/// No retries happen here; callers decide. An unauthorized answer to an
/// authenticated call ends the session before the error is returned. So does
/// an authenticated call made after the login's validity window ran out,
/// without reaching the backend.
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_prefix: String,
    session: Session,
    teardown: Arc<dyn SessionTeardown>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        api_prefix: &str,
        session: Session,
        teardown: Arc<dyn SessionTeardown>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent("fx_dashboard/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: format!("/{}", api_prefix.trim_matches('/')),
            session,
            teardown,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn api_url(&self, endpoint: &str) -> String {
        let prefix = if self.api_prefix == "/" { "" } else { self.api_prefix.as_str() };
        format!("{}{}/{}", self.base_url, prefix, endpoint.trim_start_matches('/'))
    }

    /// Calls `endpoint` (relative to the API prefix) and returns the JSON body.
    pub async fn call(&self, endpoint: &str, options: CallOptions) -> Result<Value, ApiError> {
        let url = self.api_url(endpoint);
        self.send(&url, options).await
    }

    async fn send(&self, url: &str, options: CallOptions) -> Result<Value, ApiError> {
        if options.authenticated && self.session.is_expired().await {
            warn!("Session expired before calling {}, ending session", url);
            self.teardown.logout().await;
            return Err(ApiError::Unauthorized);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let token = if options.authenticated {
            self.session.token().await
        } else {
            None
        };
        if let Some(ref token) = token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
        }
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .client
            .request(options.method.clone(), url)
            .headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(ref body) = options.body {
            request = request.json(body);
        }

        debug!("{} {}", options.method, url);
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if options.authenticated {
                warn!("Unauthorized answer from {}, ending session", url);
                self.teardown.logout().await;
            }
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                status: status.as_u16(),
                text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::MalformedPayload(e.to_string()))
    }

    async fn enveloped(&self, endpoint: &str, options: CallOptions) -> Result<ApiEnvelope, ApiError> {
        let body = self.call(endpoint, options).await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::MalformedPayload(format!("{}: {}", endpoint, e)))
    }

    /// Exchanges credentials for a token and starts the session with it.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = format!("{}/auth/login", self.base_url);
        let options = CallOptions::post(json!({ "username": username, "password": password }))
            .unauthenticated();

        let body = self.send(&url, options).await?;
        let login: LoginResponse =
            serde_json::from_value(body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;

        self.session
            .start(login.access_token.clone(), login.expires_in)
            .await;
        match self.session.expires_at().await {
            Some(at) => info!(
                "Logged in as {}, session valid until {}",
                login.username().unwrap_or(username),
                at
            ),
            None => info!("Logged in as {}", login.username().unwrap_or(username)),
        }
        Ok(login)
    }

    pub async fn dashboard_summary(&self) -> Result<ApiEnvelope, ApiError> {
        self.enveloped("/dashboard/summary", CallOptions::get()).await
    }

    pub async fn latest_signals(&self, limit: u32) -> Result<ApiEnvelope, ApiError> {
        self.enveloped("/signals/latest", CallOptions::get().query("limit", limit))
            .await
    }

    pub async fn generate_signal(&self, symbol: &str, timeframe: &str) -> Result<ApiEnvelope, ApiError> {
        let body = json!({ "symbol": symbol.to_uppercase(), "timeframe": timeframe });
        self.enveloped("/signals/generate", CallOptions::post(body)).await
    }

    pub async fn optimize_portfolio(&self, symbols: Option<&[String]>) -> Result<ApiEnvelope, ApiError> {
        let mut options = CallOptions::get();
        if let Some(symbols) = symbols.filter(|s| !s.is_empty()) {
            options = options.query("symbols", symbols.join(","));
        }
        self.enveloped("/portfolio/optimize", options).await
    }

    pub async fn performance(&self, days: u32) -> Result<ApiEnvelope, ApiError> {
        self.enveloped("/analytics/performance", CallOptions::get().query("days", days))
            .await
    }

    pub async fn market_prices(&self, symbols: &[String]) -> Result<ApiEnvelope, ApiError> {
        self.enveloped(
            "/market/prices",
            CallOptions::get().query("symbols", symbols.join(",")),
        )
        .await
    }

    pub async fn market_scan(&self) -> Result<ApiEnvelope, ApiError> {
        self.enveloped("/market/scan", CallOptions::get()).await
    }

    pub async fn news_summary(&self, symbols: Option<&[String]>) -> Result<ApiEnvelope, ApiError> {
        let mut options = CallOptions::get();
        if let Some(symbols) = symbols.filter(|s| !s.is_empty()) {
            options = options.query("symbols", symbols.join(","));
        }
        self.enveloped("/news/summary", options).await
    }

    pub async fn sentiment(&self, symbols: &[String]) -> Result<ApiEnvelope, ApiError> {
        self.enveloped(
            "/sentiment/analysis",
            CallOptions::get().query("symbols", symbols.join(",")),
        )
        .await
    }

    pub async fn backtest(&self, days: u32) -> Result<ApiEnvelope, ApiError> {
        self.enveloped("/backtest", CallOptions::get().query("days", days))
            .await
    }

    /// Not enveloped and needs no session.
    pub async fn health(&self) -> Result<Value, ApiError> {
        self.call("/health", CallOptions::get().unauthenticated())
            .await
    }
}
