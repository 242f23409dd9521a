// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # reddit-auth
//!
//! A request-pipeline stage that transparently authenticates outbound
//! Reddit API calls.
//!
//! ## Strategies
//!
//! - **Token**: a pre-obtained OAuth access token is sent as a bearer token
//!   and the request is redirected to `oauth.reddit.com`
//! - **Cookie**: a pre-obtained session cookie is merged into the request's
//!   `Cookie` header
//! - **Login**: user name and password are exchanged for a session cookie and
//!   a modhash on the first request, then replayed like a configured cookie
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reddit_auth::{AuthConfig, Authenticator, HttpTransport, RequestEnvelope, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = Arc::new(HttpTransport::new()?);
//!     let auth = Authenticator::new(transport, AuthConfig::with_credentials("alice", "hunter2"))?;
//!
//!     let request = RequestEnvelope::get("https://www.reddit.com/api/me.json")?
//!         .header("User-Agent", "my-bot/0.1 by alice")?;
//!     let response = auth.intercept(request).await?;
//!     println!("{}", response.text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Authenticator (Handler)                   │
//! │  token → rewrite host, Authorization: bearer <token>         │
//! │  cookie → Cookie: <upstream>; <session>                      │
//! │  login → POST /api/login, store cookie + modhash, then cookie│
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ next stage
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │                    HttpTransport (Handler)                   │
//! │  form/JSON encoding · retry + backoff · rate limit · errors  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request/response envelopes and the stage contract
pub mod pipeline;

/// Authenticator and modhash extraction
pub mod auth;

/// HTTP transport with retry and rate limiting
pub mod http;

/// Configuration file support
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthConfig, Authenticator, LoginConfig, Strategy};
pub use config::Settings;
pub use error::{Error, Result, ResultExt};
pub use http::{HttpTransport, HttpTransportConfig};
pub use pipeline::{Body, Handler, RequestEnvelope, ResponseEnvelope, MODHASH_KEY};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
