// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::CallToolResult;

use super::{Middleware, MiddlewareContext, Next};
use crate::cache::CacheStore;
use crate::canonical::cache_key;
use crate::error::GatewayError;

/// Caches successful tool results keyed by a canonical encoding of
/// `(tool, arguments)`. Error results are never cached.
pub struct CacheMiddleware {
    store: Arc<dyn CacheStore>,
    ttl_seconds: u64,
}

impl CacheMiddleware {
    pub fn new(store: Arc<dyn CacheStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(
        &self,
        ctx: MiddlewareContext,
        next: Next,
    ) -> Result<CallToolResult, GatewayError> {
        let key = cache_key(&ctx.tool_name, &ctx.arguments);

        if let Some(cached) = self.store.get(&key).await? {
            tracing::trace!(tool = %ctx.tool_name, "cache hit");
            let result: CallToolResult = serde_json::from_value(cached)
                .map_err(|e| GatewayError::CacheStoreFailure(e.to_string()))?;
            return Ok(result);
        }

        let result = next.run(ctx).await?;

        if result.is_error != Some(true) {
            let encoded = serde_json::to_value(&result)
                .map_err(|e| GatewayError::CacheStoreFailure(e.to_string()))?;
            self.store.set(&key, encoded, self.ttl_seconds).await?;
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "cache"
    }
}
