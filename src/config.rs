//! Configuration file support
//!
//! Settings are read from YAML or JSON:
//!
//! ```yaml
//! auth:
//!   user: alice
//!   password: hunter2
//!   remember: true
//! transport:
//!   user_agent: "my-bot/0.1 by alice"
//!   timeout_secs: 30
//!   max_retries: 3
//!   # either the shorthand
//!   requests_per_second: 1
//!   # or a full quota, which wins when both are set
//!   rate_limit:
//!     requests: 60
//!     period: minute
//!     burst_size: 10
//! login:
//!   auth_domain: https://ssl.reddit.com
//!   max_retries: 5
//!   retry_interval_secs: 2
//! ```

use crate::auth::{AuthConfig, Authenticator, LoginConfig, AUTH_DOMAIN};
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpTransport, HttpTransportConfig, RateLimiterConfig};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Top-Level Settings
// ============================================================================

/// Complete settings loaded from a config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Transport used for the authenticated requests
    #[serde(default)]
    pub transport: TransportSettings,

    /// Login endpoint and retry policy
    #[serde(default)]
    pub login: LoginSettings,
}

impl Settings {
    /// Load settings from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Parse settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse settings from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that the settings can build a pipeline
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        if self.transport.timeout_secs == 0 {
            return Err(Error::config("transport.timeout_secs must be greater than 0"));
        }
        if self.transport.requests_per_second == Some(0) {
            return Err(Error::config(
                "transport.requests_per_second must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Build an authenticator in front of an HTTP transport
    pub fn build_pipeline(&self) -> Result<Authenticator> {
        self.validate()?;
        let transport = HttpTransport::with_config(self.transport.to_config())?;
        Authenticator::with_login_config(
            Arc::new(transport),
            self.auth.clone(),
            self.login.to_config(),
        )
    }
}

// ============================================================================
// Transport Settings
// ============================================================================

/// Settings for the transport behind the authenticator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// User agent for requests that carry none
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff strategy between retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Shorthand for a per-second rate limit with an equal burst
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Full rate limit; takes precedence over `requests_per_second`
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            requests_per_second: None,
            rate_limit: None,
        }
    }
}

impl TransportSettings {
    /// Convert to a transport config
    pub fn to_config(&self) -> HttpTransportConfig {
        let mut builder = HttpTransportConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_secs(60),
            );

        if let Some(ref agent) = self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        if let Some(limit) = self.rate_limiter_config() {
            builder = builder.rate_limit(limit);
        }

        builder.build()
    }

    /// Effective rate limit, if any
    pub fn rate_limiter_config(&self) -> Option<RateLimiterConfig> {
        match (&self.rate_limit, self.requests_per_second) {
            (Some(limit), _) => Some(limit.clone()),
            (None, Some(rps)) => Some(RateLimiterConfig::per_second(rps, rps)),
            (None, None) => None,
        }
    }
}

// ============================================================================
// Login Settings
// ============================================================================

/// Settings for the login sub-request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSettings {
    /// Scheme and host of the login endpoint
    #[serde(default = "default_auth_domain")]
    pub auth_domain: String,

    /// Retries after the first login attempt
    #[serde(default = "default_login_retries")]
    pub max_retries: u32,

    /// Seconds between login attempts
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

fn default_auth_domain() -> String {
    AUTH_DOMAIN.to_string()
}

fn default_login_retries() -> u32 {
    5
}

fn default_retry_interval_secs() -> u64 {
    2
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            auth_domain: default_auth_domain(),
            max_retries: default_login_retries(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

impl LoginSettings {
    /// Convert to a login config
    pub fn to_config(&self) -> LoginConfig {
        LoginConfig::with_auth_domain(self.auth_domain.clone()).retry(
            self.max_retries,
            Duration::from_secs(self.retry_interval_secs),
        )
    }
}
