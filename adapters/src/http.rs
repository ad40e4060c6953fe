//! HTTP API adapter
//!
//! Implements the contract for remote REST backends. Authentication headers
//! are derived from the credential variant at request time, a fixed-window
//! rate limit gates every operation, and the wire client is hidden behind
//! [`HttpTransport`] so test doubles can capture outgoing requests.

use crate::metrics;
use adapter_core::{
    Adapter, AdapterConfig, AdapterError, AdapterInfo, AdapterKind, AdapterOperation,
    AdapterResult, AdapterState, AdapterStatus, ConnectionResult, Credentials, ErrorCode,
    HttpApiConfig, HttpCredentials, HttpOperation, OperationMetadata, RateLimitConfig, Result,
    StatusTracker,
};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// HTTP method for a transport request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// One outgoing request, fully composed by the adapter
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Final header set (defaults, then auth, then per-operation)
    pub headers: HashMap<String, String>,
    /// Raw body, when the verb carries one
    pub body: Option<Bytes>,
    /// Per-request timeout
    pub timeout: Duration,
}

/// One response from the wire client
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Bytes,
}

/// Failure raised by the wire client or derived from a response status
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request exceeded its time budget
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("connect error: {0}")]
    Connect(String),

    /// Response arrived with a non-success status
    #[error("status {code}: {body}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Anything the client surfaces only as text
    #[error("{0}")]
    Other(String),
}

/// Narrow interface over the wire client
///
/// Implementations perform exactly one request/response exchange; the
/// adapter owns URLs, headers, rate limiting, and classification.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one exchange.
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest`
///
/// Connection pooling and keep-alive belong to the reqwest client.
#[derive(Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a fresh client.
    pub fn new() -> std::result::Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Derive authentication headers from the credential variant.
///
/// Called per request; nothing here is cached.
fn auth_headers(credentials: &HttpCredentials) -> Vec<(String, String)> {
    match credentials {
        HttpCredentials::None => vec![],
        HttpCredentials::ApiKey { key } => vec![("X-API-Key".to_string(), key.clone())],
        HttpCredentials::BearerToken { token } => vec![(
            "Authorization".to_string(),
            format!("Bearer {}", token),
        )],
        HttpCredentials::OAuth2 { access_token } => vec![(
            "Authorization".to_string(),
            format!("Bearer {}", access_token),
        )],
        HttpCredentials::BasicAuth { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            vec![("Authorization".to_string(), format!("Basic {}", encoded))]
        }
    }
}

/// Classify a transport failure into the shared taxonomy.
///
/// Structured information (timeout, connect, status code) is preferred;
/// message inspection is the fallback for opaque client failures only.
fn classify(err: TransportError) -> AdapterError {
    match err {
        TransportError::Timeout(msg) => AdapterError::new(ErrorCode::Timeout, msg),
        TransportError::Connect(msg) => AdapterError::new(ErrorCode::ConnectionFailed, msg),
        TransportError::Status { code, body } => {
            let details = json!({ "status": code, "body": body });
            let err = match code {
                429 => AdapterError::new(
                    ErrorCode::RateLimit,
                    format!("remote rate limit (status {})", code),
                ),
                401 => AdapterError::new(ErrorCode::Unauthorized, "authentication rejected"),
                403 => AdapterError::new(ErrorCode::Forbidden, "access forbidden"),
                404 => AdapterError::new(ErrorCode::NotFound, "resource not found"),
                500..=599 => AdapterError::new(
                    ErrorCode::ServerError,
                    format!("server error (status {})", code),
                ),
                _ => AdapterError::new(
                    ErrorCode::HttpError,
                    format!("request failed with status {}", code),
                ),
            };
            err.with_details(details)
        }
        TransportError::Other(msg) => {
            let lower = msg.to_lowercase();
            if lower.contains("timeout") {
                AdapterError::new(ErrorCode::Timeout, msg)
            } else if lower.contains("rate limit") {
                AdapterError::new(ErrorCode::RateLimit, msg)
            } else if lower.contains("500") {
                AdapterError::new(ErrorCode::ServerError, msg)
            } else {
                AdapterError::new(ErrorCode::Internal, msg)
            }
        }
    }
}

/// Fixed-window request counter
///
/// Plain fields under the single-owner assumption; the window start moves
/// only when a full window has elapsed.
#[derive(Debug)]
struct RateLimitWindow {
    limit: u32,
    window: Duration,
    count: u32,
    window_start: tokio::time::Instant,
}

impl RateLimitWindow {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            limit: config.requests,
            window: Duration::from_secs(config.window_seconds),
            count: 0,
            window_start: tokio::time::Instant::now(),
        }
    }

    /// Admit one request, resetting the counter first when the window has
    /// elapsed.
    fn try_admit(&mut self) -> std::result::Result<(), AdapterError> {
        let now = tokio::time::Instant::now();
        if now.duration_since(self.window_start) >= self.window {
            self.window_start = now;
            self.count = 0;
        }
        if self.count >= self.limit {
            let retry_after = self.window - now.duration_since(self.window_start);
            return Err(AdapterError::new(
                ErrorCode::RateLimit,
                format!(
                    "rate limit of {} requests per {}s exhausted",
                    self.limit,
                    self.window.as_secs()
                ),
            )
            .with_details(json!({ "retry_after_ms": retry_after.as_millis() as u64 })));
        }
        self.count += 1;
        Ok(())
    }

    fn remaining(&self) -> u32 {
        if tokio::time::Instant::now().duration_since(self.window_start) >= self.window {
            self.limit
        } else {
            self.limit.saturating_sub(self.count)
        }
    }
}

/// Adapter for remote REST backends
pub struct HttpApiAdapter {
    info: AdapterInfo,
    state: AdapterState,
    config: Option<HttpApiConfig>,
    credentials: Option<HttpCredentials>,
    transport: Box<dyn HttpTransport>,
    rate_limit: Option<RateLimitWindow>,
    tracker: StatusTracker,
    connection_id: Option<Uuid>,
}

impl HttpApiAdapter {
    /// Adapter over a caller-supplied transport.
    pub fn new(id: impl Into<String>, transport: Box<dyn HttpTransport>) -> Self {
        Self {
            info: AdapterInfo {
                id: id.into(),
                name: "HTTP API Adapter".to_string(),
                kind: AdapterKind::HttpApi,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: "REST connectivity with credential-derived auth and rate limiting"
                    .to_string(),
            },
            state: AdapterState::Uninitialized,
            config: None,
            credentials: None,
            transport,
            rate_limit: None,
            tracker: StatusTracker::new(),
            connection_id: None,
        }
    }

    /// Adapter over a fresh reqwest client.
    pub fn remote(id: impl Into<String>) -> Result<Self> {
        let transport = ReqwestTransport::new()
            .map_err(|e| AdapterError::new(ErrorCode::ConnectionFailed, e.to_string()))?;
        Ok(Self::new(id, Box::new(transport)))
    }

    fn config(&self) -> &HttpApiConfig {
        self.config
            .as_ref()
            .expect("dispatch is only reachable after initialize")
    }

    fn build_url(
        &self,
        path: &str,
        query: &HashMap<String, String>,
    ) -> std::result::Result<String, AdapterError> {
        let cfg = self.config();
        let joined = format!(
            "{}/{}",
            cfg.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if query.is_empty() {
            return Ok(joined);
        }
        let url = reqwest::Url::parse_with_params(&joined, query.iter())
            .map_err(|e| AdapterError::invalid_config(format!("invalid request URL: {}", e)))?;
        Ok(url.into())
    }

    /// Compose the final header set: defaults, then credential-derived auth,
    /// then per-operation headers. Later layers win.
    fn compose_headers(&self, extra: &HashMap<String, String>) -> HashMap<String, String> {
        let mut headers = self.config().default_headers.clone();
        if let Some(creds) = &self.credentials {
            for (name, value) in auth_headers(creds) {
                headers.insert(name, value);
            }
        }
        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config().timeout_seconds)
    }

    /// Send a fully composed request and surface non-success statuses as
    /// structured errors.
    async fn send_checked(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let response = self.transport.send(request).await?;
        if response.status >= 400 {
            let body = String::from_utf8_lossy(&response.body);
            let body = body.chars().take(512).collect::<String>();
            return Err(TransportError::Status {
                code: response.status,
                body,
            });
        }
        Ok(response)
    }

    /// Probe the health path. Bypasses the rate-limit window: observability
    /// must not consume request quota.
    async fn probe(
        &self,
        credentials: &HttpCredentials,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let cfg = self.config();
        let url = format!(
            "{}/{}",
            cfg.base_url.trim_end_matches('/'),
            cfg.health_path.trim_start_matches('/')
        );
        let mut headers = cfg.default_headers.clone();
        for (name, value) in auth_headers(credentials) {
            headers.insert(name, value);
        }
        self.send_checked(TransportRequest {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
            timeout: self.request_timeout(),
        })
        .await
    }

    fn json_body(body: Option<Value>) -> Option<Bytes> {
        body.map(|v| Bytes::from(serde_json::to_vec(&v).unwrap_or_default()))
    }

    fn parse_body(body: &Bytes) -> Value {
        if body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::from(String::from_utf8_lossy(body).into_owned()))
    }

    async fn dispatch(&mut self, op: HttpOperation) -> std::result::Result<Value, AdapterError> {
        if let Some(window) = &mut self.rate_limit {
            window.try_admit()?;
        }

        let (method, path, query, mut headers, body, download) = match op {
            HttpOperation::Get {
                path,
                query,
                headers,
            } => (HttpMethod::Get, path, query, headers, None, false),
            HttpOperation::Post {
                path,
                body,
                headers,
            } => (
                HttpMethod::Post,
                path,
                HashMap::new(),
                headers,
                Self::json_body(body),
                false,
            ),
            HttpOperation::Put {
                path,
                body,
                headers,
            } => (
                HttpMethod::Put,
                path,
                HashMap::new(),
                headers,
                Self::json_body(body),
                false,
            ),
            HttpOperation::Patch {
                path,
                body,
                headers,
            } => (
                HttpMethod::Patch,
                path,
                HashMap::new(),
                headers,
                Self::json_body(body),
                false,
            ),
            HttpOperation::Delete { path, headers } => {
                (HttpMethod::Delete, path, HashMap::new(), headers, None, false)
            }
            HttpOperation::Upload {
                path,
                file_name,
                content_type,
                contents,
            } => {
                let mut headers = HashMap::new();
                headers.insert("Content-Type".to_string(), content_type);
                headers.insert("X-File-Name".to_string(), file_name);
                (HttpMethod::Post, path, HashMap::new(), headers, Some(contents), false)
            }
            HttpOperation::Download { path, headers } => {
                (HttpMethod::Get, path, HashMap::new(), headers, None, true)
            }
        };

        if body.is_some() && !headers.contains_key("Content-Type") {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        let url = self.build_url(&path, &query)?;
        let request = TransportRequest {
            method,
            url,
            headers: self.compose_headers(&headers),
            body,
            timeout: self.request_timeout(),
        };

        let response = self.send_checked(request).await.map_err(classify)?;
        if download {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&response.body);
            Ok(json!({
                "status": response.status,
                "bytes": response.body.len(),
                "content": encoded,
            }))
        } else {
            Ok(json!({
                "status": response.status,
                "body": Self::parse_body(&response.body),
            }))
        }
    }

    fn metadata_json(&self) -> Value {
        match &self.config {
            Some(cfg) => json!({
                "base_url": cfg.base_url,
                "timeout_seconds": cfg.timeout_seconds,
                "retries": cfg.retries,
                "rate_limit": cfg.rate_limit.map(|rl| json!({
                    "requests": rl.requests,
                    "window_seconds": rl.window_seconds,
                    "remaining": self.rate_limit.as_ref().map(|w| w.remaining()),
                })),
            }),
            None => json!({}),
        }
    }
}

#[async_trait]
impl Adapter for HttpApiAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn state(&self) -> AdapterState {
        self.state
    }

    async fn initialize(&mut self, config: AdapterConfig) -> Result<()> {
        if self.state == AdapterState::ShutDown {
            return Err(AdapterError::new(
                ErrorCode::InvalidState,
                "adapter has been shut down",
            ));
        }
        let cfg = match config {
            AdapterConfig::HttpApi(cfg) => cfg,
            other => {
                return Err(AdapterError::invalid_config(format!(
                    "expected http_api configuration, got {}",
                    other.kind()
                )))
            }
        };
        cfg.validate()?;
        reqwest::Url::parse(&cfg.base_url)
            .map_err(|e| AdapterError::invalid_config(format!("base_url does not parse: {}", e)))?;

        info!(adapter = %self.info.id, base_url = %cfg.base_url, "http adapter initialized");
        self.rate_limit = cfg.rate_limit.map(RateLimitWindow::new);
        self.config = Some(cfg);
        if self.state == AdapterState::Uninitialized {
            self.state = AdapterState::Initialized;
        }
        Ok(())
    }

    async fn connect(&mut self, credentials: Credentials) -> ConnectionResult {
        if self.state == AdapterState::ShutDown {
            return ConnectionResult::refused(AdapterError::new(
                ErrorCode::InvalidState,
                "adapter has been shut down",
            ));
        }
        if self.config.is_none() {
            self.tracker.record_error();
            return ConnectionResult::refused(AdapterError::new(
                ErrorCode::NotInitialized,
                "connect called before initialize",
            ));
        }
        let creds = match credentials {
            Credentials::Http(creds) => creds,
            other => {
                self.tracker.record_error();
                return ConnectionResult::refused(AdapterError::invalid_config(format!(
                    "expected http credentials, got {:?}",
                    other
                )));
            }
        };

        let started = tokio::time::Instant::now();
        match self.probe(&creds).await {
            Ok(response) => {
                let connection_id = Uuid::new_v4();
                self.state = AdapterState::Connected;
                self.credentials = Some(creds);
                self.connection_id = Some(connection_id);
                self.tracker.record_connect();
                self.tracker.record_latency(started.elapsed());
                metrics::set_connected(&self.info.id, self.info.kind, true);
                info!(adapter = %self.info.id, %connection_id, status = response.status, "http session established");
                ConnectionResult::established_with(
                    connection_id,
                    json!({ "probe_status": response.status }),
                )
            }
            Err(err) => {
                self.tracker.record_error();
                let failure = classify(err);
                warn!(adapter = %self.info.id, error = %failure, "http connect probe failed");
                ConnectionResult::refused(failure)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.state != AdapterState::Connected {
            return Ok(());
        }
        // Keep-alive pooling belongs to the transport; dropping the session
        // only forgets credentials and the session token.
        self.state = AdapterState::Disconnected;
        self.credentials = None;
        self.connection_id = None;
        metrics::set_connected(&self.info.id, self.info.kind, false);
        info!(adapter = %self.info.id, "http session closed");
        Ok(())
    }

    async fn execute(&mut self, operation: AdapterOperation) -> AdapterResult {
        let name = operation.name();
        let started = tokio::time::Instant::now();

        let outcome = if self.state != AdapterState::Connected {
            Err(AdapterError::not_connected())
        } else {
            match operation {
                AdapterOperation::Http(op) => self.dispatch(op).await,
                other => Err(AdapterError::unsupported_operation(format!(
                    "http adapter cannot execute {} operations",
                    other.family()
                ))),
            }
        };

        let elapsed = started.elapsed();
        metrics::record_operation(&self.info.id, name, outcome.is_ok(), elapsed);
        let metadata = OperationMetadata::new(name, elapsed);
        match outcome {
            Ok(data) => {
                self.tracker.touch();
                self.tracker.record_latency(elapsed);
                AdapterResult::ok(data, metadata)
            }
            Err(err) => {
                self.tracker.record_error();
                warn!(adapter = %self.info.id, operation = name, error = %err, "http operation failed");
                AdapterResult::fail(err, metadata)
            }
        }
    }

    async fn is_healthy(&mut self) -> bool {
        if self.state != AdapterState::Connected {
            return false;
        }
        let Some(creds) = self.credentials.clone() else {
            return false;
        };
        let started = tokio::time::Instant::now();
        match self.probe(&creds).await {
            Ok(_) => {
                self.tracker.record_latency(started.elapsed());
                self.tracker.touch();
                true
            }
            Err(_) => false,
        }
    }

    fn status(&self) -> AdapterStatus {
        self.tracker
            .snapshot(self.state == AdapterState::Connected, self.metadata_json())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.state == AdapterState::ShutDown {
            return Ok(());
        }
        let result = self.disconnect().await;
        self.state = AdapterState::ShutDown;
        info!(adapter = %self.info.id, "http adapter shut down");
        result
    }
}
