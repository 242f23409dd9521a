//! HTTP transport module
//!
//! The terminal stage of the request pipeline.
//!
//! # Features
//!
//! - **Body Encoding**: Form bodies are URL-encoded, JSON bodies serialized
//! - **Automatic Retries**: Bounded retry with constant, linear or exponential backoff
//! - **Rate Limiting**: Optional token bucket rate limiter using governor
//! - **Error Translation**: Non-success statuses surface as `Error::HttpStatus`

mod rate_limit;
mod transport;

pub use rate_limit::{RateLimiter, RateLimiterConfig, RatePeriod};
pub use transport::{HttpTransport, HttpTransportConfig, HttpTransportConfigBuilder};
