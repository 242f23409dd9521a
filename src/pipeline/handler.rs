//! Pipeline stage contract

use super::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A stage in the outbound request pipeline
///
/// Stages compose by holding an `Arc<dyn Handler>` for the next stage and
/// delegating to it once they have finished with the request.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process a request and return the response of the downstream chain
    async fn call(&self, request: RequestEnvelope) -> Result<ResponseEnvelope>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, request: RequestEnvelope) -> Result<ResponseEnvelope> {
        (**self).call(request).await
    }
}
