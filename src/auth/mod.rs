//! Authentication module
//!
//! Supports: bearer token, pre-obtained session cookie, on-demand login
//!
//! The `Authenticator` is a pipeline stage. It picks a strategy per request,
//! performs the login round-trip when no session exists yet, and hands the
//! modhash to later stages through the request context.

mod authenticator;
mod modhash;
mod types;

pub use authenticator::Authenticator;
pub use modhash::{extract_jsonpath, extract_modhash, extract_modhash_from_value, MODHASH_HEADER};
pub use types::{
    AuthConfig, LoginConfig, SessionState, Strategy, AUTH_DOMAIN, AUTH_PATH, OAUTH_HOST, OAUTH_PORT,
};

#[cfg(test)]
mod tests;
