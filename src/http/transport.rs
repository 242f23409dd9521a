//! HTTP transport with retry and rate limiting
//!
//! Sends a [`RequestEnvelope`] over the network and handles:
//! - Automatic retries with configurable backoff
//! - Rate limiting to stay inside API quotas
//! - URL-encoding of form bodies
//! - Translation of non-success statuses into errors

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{is_retryable_status, Error, Result};
use crate::pipeline::{Body, Handler, RequestEnvelope, ResponseEnvelope};
use crate::types::{BackoffType, StringMap};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent sent when the request carries none
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            default_headers: StringMap::new(),
            user_agent: format!("reddit-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpTransportConfig {
    /// Create a new config builder
    pub fn builder() -> HttpTransportConfigBuilder {
        HttpTransportConfigBuilder::default()
    }
}

/// Builder for HTTP transport config
#[derive(Default)]
pub struct HttpTransportConfigBuilder {
    config: HttpTransportConfig,
}

impl HttpTransportConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Use the same delay between every attempt
    pub fn constant_backoff(self, interval: Duration) -> Self {
        self.backoff(BackoffType::Constant, interval, interval)
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpTransportConfig {
        self.config
    }
}

/// Terminal pipeline stage that performs the HTTP call
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpTransport {
    /// Create a transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a transport that shares an existing reqwest client
    pub fn with_client(client: Client, config: HttpTransportConfig) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        Self {
            client,
            config,
            rate_limiter,
        }
    }

    /// Get the transport configuration
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Send a request, retrying transient failures
    ///
    /// Once retries run out the last failure is returned as is: the final
    /// status as [`Error::HttpStatus`] (or [`Error::RateLimited`] for 429),
    /// or the final timeout or connection error.
    pub async fn send(&self, request: RequestEnvelope) -> Result<ResponseEnvelope> {
        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }
            let retries_left = attempt < self.config.max_retries;

            match self.build_request(&request).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if !retries_left {
                            return Err(Error::RateLimited {
                                retry_after_seconds: retry_after,
                            });
                        }
                        let delay =
                            std::cmp::min(Duration::from_secs(retry_after), self.config.max_backoff);
                        self.pause(&request, &mut attempt, delay, "429 Too Many Requests")
                            .await;
                        continue;
                    }

                    if retries_left && is_retryable_status(status.as_u16()) {
                        let delay = self.calculate_backoff(attempt);
                        self.pause(&request, &mut attempt, delay, status).await;
                        continue;
                    }

                    let response = ResponseEnvelope::from_response(response).await?;
                    if !status.is_success() {
                        return Err(Error::http_status(status.as_u16(), response.text()));
                    }

                    debug!("{} {} -> {}", request.method, request.url, status.as_u16());
                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    if !retries_left {
                        return Err(Error::Timeout {
                            timeout_ms: self.config.timeout.as_millis() as u64,
                        });
                    }
                    let delay = self.calculate_backoff(attempt);
                    self.pause(&request, &mut attempt, delay, "timeout").await;
                }
                Err(e) if e.is_connect() && retries_left => {
                    let delay = self.calculate_backoff(attempt);
                    self.pause(&request, &mut attempt, delay, "connection error").await;
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }
    }

    /// Log a transient failure, wait, and count the attempt
    async fn pause(
        &self,
        request: &RequestEnvelope,
        attempt: &mut u32,
        delay: Duration,
        reason: impl std::fmt::Display,
    ) {
        *attempt += 1;
        warn!(
            "{} {} got {}; retry {}/{} in {:?}",
            request.method, request.url, reason, attempt, self.config.max_retries, delay
        );
        tokio::time::sleep(delay).await;
    }

    /// Translate an envelope into a reqwest request
    fn build_request(&self, request: &RequestEnvelope) -> RequestBuilder {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.headers.contains_key(USER_AGENT) {
            req = req.header(USER_AGENT, self.config.user_agent.as_str());
        }

        req = req.headers(request.headers.clone());

        req = match &request.body {
            Body::Empty => req,
            Body::Bytes(bytes) => req.body(bytes.clone()),
            Body::Json(value) => req.json(value),
            Body::Form(fields) => req.form(fields),
        };

        req.timeout(self.config.timeout)
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl Handler for HttpTransport {
    async fn call(&self, request: RequestEnvelope) -> Result<ResponseEnvelope> {
        self.send(request).await
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Extract retry-after header value
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
