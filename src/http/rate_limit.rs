//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting. Reddit publishes
//! its limits per minute, so quotas can be expressed per second or per minute.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Period a quota is replenished over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePeriod {
    /// Quota counts requests per second
    #[default]
    Second,
    /// Quota counts requests per minute
    Minute,
}

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Number of requests allowed per period
    pub requests: u32,
    /// Replenishment period
    #[serde(default)]
    pub period: RatePeriod,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests: 60,
            period: RatePeriod::Minute,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Quota of N requests per second
    pub fn per_second(requests: u32, burst_size: u32) -> Self {
        Self {
            requests,
            period: RatePeriod::Second,
            burst_size,
        }
    }

    /// Quota of N requests per minute
    pub fn per_minute(requests: u32, burst_size: u32) -> Self {
        Self {
            requests,
            period: RatePeriod::Minute,
            burst_size,
        }
    }

    fn quota(&self) -> Quota {
        let requests = NonZeroU32::new(self.requests).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = match self.period {
            RatePeriod::Second => Quota::per_second(requests),
            RatePeriod::Minute => Quota::per_minute(requests),
        };
        quota.allow_burst(burst)
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            limiter: Arc::new(Governor::direct(config.quota())),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait with a timeout
    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.limiter.until_ready())
            .await
            .is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}
