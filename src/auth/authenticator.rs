//! Authenticator implementation
//!
//! Applies one of three strategies to every request passing through the
//! pipeline, in priority order:
//!
//! 1. **Token**: redirect to the OAuth host and send `Authorization: bearer <token>`
//! 2. **Cookie**: append the known session cookie to the request's `Cookie` header
//! 3. **Login**: log in first, remember the returned cookie and modhash, then
//!    continue as for the cookie strategy
//!
//! The session lives behind a `RwLock`. The write lock is held across the
//! login round-trip and the cookie is re-checked once acquired, so requests
//! racing through a fresh authenticator trigger a single login.

use super::modhash::extract_modhash;
use super::types::{AuthConfig, LoginConfig, SessionState, Strategy, OAUTH_HOST, OAUTH_PORT};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpTransport;
use crate::pipeline::{Body, Handler, RequestEnvelope, ResponseEnvelope};
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, SET_COOKIE,
};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Pipeline stage that authenticates outbound requests
pub struct Authenticator {
    /// Next pipeline stage
    next: Arc<dyn Handler>,
    /// Static configuration
    config: AuthConfig,
    /// Login endpoint and retry policy
    login_config: LoginConfig,
    /// Parsed login endpoint
    login_url: Url,
    /// Cookie and modhash currently in use
    session: RwLock<SessionState>,
    /// HTTP client shared by login transports
    http_client: Client,
}

impl Authenticator {
    /// Create an authenticator in front of `next`
    ///
    /// Fails with a configuration error when no usable credential is set.
    /// No network activity happens here.
    pub fn new(next: Arc<dyn Handler>, config: AuthConfig) -> Result<Self> {
        Self::with_login_config(next, config, LoginConfig::default())
    }

    /// Create an authenticator with a custom login endpoint or retry policy
    pub fn with_login_config(
        next: Arc<dyn Handler>,
        config: AuthConfig,
        login_config: LoginConfig,
    ) -> Result<Self> {
        let http_client = Client::builder().build()?;
        Self::with_client(next, config, login_config, http_client)
    }

    /// Create an authenticator that logs in through an existing reqwest client
    pub fn with_client(
        next: Arc<dyn Handler>,
        config: AuthConfig,
        login_config: LoginConfig,
        http_client: Client,
    ) -> Result<Self> {
        config.validate()?;

        let login_url = Url::parse(&login_config.login_url())
            .map_err(|e| Error::config(e.to_string()))
            .with_context(|| format!("invalid login endpoint '{}'", login_config.login_url()))?;

        let session = SessionState {
            cookie: config.cookie().map(String::from),
            modhash: None,
        };

        Ok(Self {
            next,
            config,
            login_config,
            login_url,
            session: RwLock::new(session),
            http_client,
        })
    }

    /// Authenticate a request and pass it to the next stage
    pub async fn intercept(&self, mut request: RequestEnvelope) -> Result<ResponseEnvelope> {
        self.authenticate(&mut request).await?;
        self.next.call(request).await
    }

    /// Apply the current strategy to a request without sending it
    ///
    /// Returns the strategy that was applied. A failed login leaves both the
    /// request and the session untouched.
    pub async fn authenticate(&self, request: &mut RequestEnvelope) -> Result<Strategy> {
        if let Some(token) = self.config.access_token() {
            apply_access_token(request, token)?;
            debug!("Applied token authentication, target {}", request.url);
            return Ok(Strategy::Token);
        }

        {
            let session = self.session.read().await;
            if session.cookie.is_some() {
                apply_session(request, &session)?;
                debug!("Applied cookie authentication to {}", request.url);
                return Ok(Strategy::Cookie);
            }
        }

        let mut session = self.session.write().await;

        // Another request may have logged in while we waited for the lock
        if session.cookie.is_some() {
            apply_session(request, &session)?;
            debug!("Applied cookie from concurrent login to {}", request.url);
            return Ok(Strategy::Cookie);
        }

        let fresh = self.login(&request.headers).await?;
        *session = fresh;
        apply_session(request, &session)?;

        Ok(Strategy::Login)
    }

    /// The strategy the next request would use
    pub async fn strategy(&self) -> Strategy {
        if self.config.access_token().is_some() {
            Strategy::Token
        } else if self.session.read().await.cookie.is_some() {
            Strategy::Cookie
        } else {
            Strategy::Login
        }
    }

    /// The session cookie currently in use
    pub async fn session_cookie(&self) -> Option<String> {
        self.session.read().await.cookie.clone()
    }

    /// The modhash from the last login
    pub async fn modhash(&self) -> Option<String> {
        self.session.read().await.modhash.clone()
    }

    /// Snapshot of the session state
    pub async fn session(&self) -> SessionState {
        self.session.read().await.clone()
    }

    /// Get the auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Get the login config
    pub fn login_config(&self) -> &LoginConfig {
        &self.login_config
    }

    /// Exchange user name and password for a session cookie and modhash
    async fn login(&self, headers: &HeaderMap) -> Result<SessionState> {
        let (user, password) = self
            .config
            .credentials()
            .ok_or_else(Error::missing_credentials)?;
        let remember = self.config.remember.unwrap_or(false);

        let mut request = RequestEnvelope::new(reqwest::Method::POST, self.login_url.clone());
        request.headers = login_headers(headers);
        request.body = Body::form([
            ("user", user.to_string()),
            ("passwd", password.to_string()),
            ("rem", remember.to_string()),
            ("api_type", "json".to_string()),
        ]);

        info!("Logging in as {} via {}", user, self.login_url);

        let transport =
            HttpTransport::with_client(self.http_client.clone(), self.login_config.transport_config());
        let response = transport.send(request).await.map_err(|e| {
            warn!("Login request for {} failed: {}", user, e);
            Error::login_failed_from("login request failed", e)
        })?;

        let session = parse_login_response(&response)?;
        info!(
            "Logged in as {} (modhash {})",
            user,
            if session.modhash.is_some() { "received" } else { "missing" }
        );
        Ok(session)
    }
}

#[async_trait]
impl Handler for Authenticator {
    async fn call(&self, request: RequestEnvelope) -> Result<ResponseEnvelope> {
        self.intercept(request).await
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("login_url", &self.login_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Redirect to the OAuth host and set the bearer token
fn apply_access_token(request: &mut RequestEnvelope, token: &str) -> Result<()> {
    request
        .url
        .set_scheme("https")
        .map_err(|()| Error::Other(format!("cannot switch {} to https", request.url)))?;
    request.url.set_host(Some(OAUTH_HOST))?;
    request
        .url
        .set_port(Some(OAUTH_PORT))
        .map_err(|()| Error::Other(format!("cannot set port on {}", request.url)))?;
    request.set_sensitive_header(AUTHORIZATION, &format!("bearer {token}"))
}

/// Merge the session cookie into the request and expose the modhash
fn apply_session(request: &mut RequestEnvelope, session: &SessionState) -> Result<()> {
    if let Some(cookie) = session.cookie.as_deref() {
        apply_cookie(request, cookie)?;
    }
    if let Some(modhash) = session.modhash.as_deref() {
        request.context.set_modhash(modhash);
    }
    Ok(())
}

/// Append `cookie` after any cookies already on the request
fn apply_cookie(request: &mut RequestEnvelope, cookie: &str) -> Result<()> {
    let mut merged: Vec<u8> = Vec::new();
    for upstream in request.headers.get_all(COOKIE) {
        merged.extend_from_slice(upstream.as_bytes());
        merged.extend_from_slice(b"; ");
    }
    merged.extend_from_slice(cookie.as_bytes());

    let mut value =
        HeaderValue::from_bytes(&merged).map_err(|e| Error::invalid_header(COOKIE.as_str(), e))?;
    value.set_sensitive(true);
    request.headers.insert(COOKIE, value);
    Ok(())
}

/// Headers for the login request: everything except body framing
fn login_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in [CONTENT_TYPE, CONTENT_LENGTH, HOST] {
        headers.remove(name);
    }
    headers
}

/// Pull the session cookie and modhash out of a login response
fn parse_login_response(response: &ResponseEnvelope) -> Result<SessionState> {
    if let Ok(body) = response.json::<Value>() {
        let errors = login_errors(&body);
        if !errors.is_empty() {
            return Err(Error::login_failed(errors.join("; ")));
        }
    }

    let cookies = response.header_values(SET_COOKIE.as_str());
    if cookies.is_empty() {
        return Err(Error::login_failed(
            "login response carried no session cookie",
        ));
    }

    Ok(SessionState {
        cookie: Some(cookies.join(", ")),
        modhash: extract_modhash(response),
    })
}

/// Errors reported in `json.errors`, each formatted as `CODE: message`
fn login_errors(body: &Value) -> Vec<String> {
    let Some(errors) = body.pointer("/json/errors").and_then(Value::as_array) else {
        return Vec::new();
    };

    errors
        .iter()
        .map(|error| match error.as_array() {
            Some(parts) => parts
                .iter()
                .take(2)
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(": "),
            None => error.to_string(),
        })
        .collect()
}
