//! Single-shot HTTP client
//!
//! The adapter issues exactly one request per call: auth headers applied,
//! bounded timeout, rate limiter consulted. Transport failures surface as
//! [`Error::Transport`]/[`Error::Timeout`]; HTTP error statuses are returned
//! as ordinary responses for the retry policy to interpret.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::retry::{AttemptOutcome, RetryContext, RetryDecision, RetryPolicy};
use crate::types::{JsonValue, Method};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL prepended to request paths
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// Rate limiter configuration (None disables limiting)
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            default_headers: HashMap::new(),
            rate_limit: Some(RateLimiterConfig::default()),
            user_agent: format!("synckit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A single page request
///
/// Built by the sync driver, advanced by the paginator.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// HTTP method
    pub method: Method,
    /// Request URL (absolute, or a path resolved against the base URL)
    pub url: String,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
}

impl PageRequest {
    /// Create a GET request for the given URL or path
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replace the URL, clearing query parameters
    ///
    /// Used by next-link pagination, where the response supplies a complete
    /// URL that already encodes the page position.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self.query.clear();
        self
    }
}

/// A single page response
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body (non-JSON bodies become a JSON string)
    pub body: JsonValue,
}

impl PageResponse {
    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the Retry-After header (seconds form)
    pub fn retry_after(&self) -> Option<u64> {
        self.header("retry-after").and_then(|s| s.parse().ok())
    }
}

/// Single-shot HTTP client with auth and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Authenticator,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpClientConfig, authenticator: Authenticator) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            authenticator,
            rate_limiter,
        }
    }

    /// Issue one request
    ///
    /// Exactly one network call; no retries. Any HTTP status comes back as
    /// a [`PageResponse`].
    pub async fn send(&self, request: &PageRequest) -> Result<PageResponse> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let full_url = self.build_url(&request.url);
        let mut req = self.client.request(request.method.into(), &full_url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }
        req = self.authenticator.apply(req);

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Transport(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(Error::Transport)?;
        let body = if text.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        };

        debug!(status, url = %full_url, "request completed");
        Ok(PageResponse {
            status,
            headers,
            body,
        })
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Send a request, retrying per the policy
///
/// The driver's FETCH step: issues the request through the adapter, asks
/// the policy about each failure, sleeps the decided (jittered) wait, and
/// converts exhaustion into the terminal error for the table.
pub async fn send_with_retry(
    client: &HttpClient,
    policy: &RetryPolicy,
    request: &PageRequest,
) -> Result<PageResponse> {
    let mut ctx = RetryContext::new();

    loop {
        let outcome = match client.send(request).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => AttemptOutcome::from_response(&response),
            Err(err) if err.is_retryable() => AttemptOutcome::transport(&err),
            Err(err) => return Err(err),
        };

        match policy.decide(&ctx, &outcome) {
            RetryDecision::RetryAfter(wait) => {
                let wait = policy.jittered(wait);
                warn!(
                    attempt = ctx.total_attempts() + 1,
                    wait_ms = wait.as_millis() as u64,
                    outcome = %outcome,
                    url = %request.url,
                    "retrying request"
                );
                tokio::time::sleep(wait).await;
                ctx.record(&outcome);
            }
            RetryDecision::GiveUp => return Err(ctx.into_error(&outcome)),
        }
    }
}
