//! Auth configuration types

use crate::error::{Error, Result};
use crate::http::HttpTransportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Domain the login endpoint lives on
pub const AUTH_DOMAIN: &str = "https://ssl.reddit.com";

/// Path of the login endpoint
pub const AUTH_PATH: &str = "/api/login";

/// Dedicated API host for bearer-token requests
pub const OAUTH_HOST: &str = "oauth.reddit.com";

/// Port bearer-token requests are sent to
pub const OAUTH_PORT: u16 = 443;

/// Static authentication options
///
/// At least one of `user` + `password`, `cookie` or `access_token` must be
/// set. Empty strings count as unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Account name used for the login flow
    #[serde(default)]
    pub user: Option<String>,
    /// Account password used for the login flow
    #[serde(default)]
    pub password: Option<String>,
    /// Ask the login endpoint for a persistent session
    #[serde(default)]
    pub remember: Option<bool>,
    /// Pre-obtained OAuth access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Pre-obtained session cookie
    #[serde(default)]
    pub cookie: Option<String>,
}

impl AuthConfig {
    /// Config that logs in with a user name and password
    pub fn with_credentials(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Config that replays a session cookie
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
            ..Self::default()
        }
    }

    /// Config that sends a bearer token
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Set the `rem` flag sent on login
    #[must_use]
    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = Some(remember);
        self
    }

    /// The configured access token, if non-empty
    pub fn access_token(&self) -> Option<&str> {
        non_empty(self.access_token.as_deref())
    }

    /// The configured cookie, if non-empty
    pub fn cookie(&self) -> Option<&str> {
        non_empty(self.cookie.as_deref())
    }

    /// User name and password, if both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(self.user.as_deref())?,
            non_empty(self.password.as_deref())?,
        ))
    }

    /// Check that some usable credential is configured
    pub fn validate(&self) -> Result<()> {
        if self.credentials().is_some() || self.cookie().is_some() || self.access_token().is_some() {
            Ok(())
        } else {
            Err(Error::missing_credentials())
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn redact<T>(value: &Option<T>) -> &'static str {
    if value.is_some() {
        "[REDACTED]"
    } else {
        "None"
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("remember", &self.remember)
            .field("access_token", &redact(&self.access_token))
            .field("cookie", &redact(&self.cookie))
            .finish()
    }
}

/// Settings for the login sub-request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginConfig {
    /// Scheme and host of the login endpoint
    pub auth_domain: String,
    /// Retries after the first login attempt
    pub max_retries: u32,
    /// Delay between login attempts
    pub retry_interval: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            auth_domain: AUTH_DOMAIN.to_string(),
            max_retries: 5,
            retry_interval: Duration::from_secs(2),
        }
    }
}

impl LoginConfig {
    /// Point the login flow at a different domain
    pub fn with_auth_domain(auth_domain: impl Into<String>) -> Self {
        Self {
            auth_domain: auth_domain.into(),
            ..Self::default()
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn retry(mut self, max_retries: u32, interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = interval;
        self
    }

    /// Full URL of the login endpoint
    pub fn login_url(&self) -> String {
        format!("{}{}", self.auth_domain.trim_end_matches('/'), AUTH_PATH)
    }

    /// Transport settings for the short-lived login transport
    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::builder()
            .max_retries(self.max_retries)
            .constant_backoff(self.retry_interval)
            .no_rate_limit()
            .build()
    }
}

/// How a request gets authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bearer token against the OAuth host
    Token,
    /// Replay a known session cookie
    Cookie,
    /// Log in first, then replay the new cookie
    Login,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Token => "token",
            Strategy::Cookie => "cookie",
            Strategy::Login => "login",
        };
        f.write_str(name)
    }
}

/// Session material held by an authenticator
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Active session cookie, replayed verbatim
    pub cookie: Option<String>,
    /// Modhash returned by the last login
    pub modhash: Option<String>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("cookie", &redact(&self.cookie))
            .field("modhash", &self.modhash)
            .finish()
    }
}
