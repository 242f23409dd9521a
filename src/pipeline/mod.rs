//! Request pipeline module
//!
//! A pipeline is a chain of stages. Each stage receives a mutable
//! [`RequestEnvelope`], may rewrite it, and hands it to the next stage;
//! the terminal stage (usually [`crate::http::HttpTransport`]) performs
//! the network call and produces a [`ResponseEnvelope`].
//!
//! ```text
//! caller ──► Authenticator ──► HttpTransport ──► network
//!        ◄──────────────── ResponseEnvelope ◄──
//! ```

mod envelope;
mod handler;

pub use envelope::{Body, RequestContext, RequestEnvelope, ResponseEnvelope, MODHASH_KEY};
pub use handler::Handler;
