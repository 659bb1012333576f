// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Onion-style middleware chain.
//!
//! Middleware execution is modelled as a recursive invocation over an
//! ordered list carrying an index cursor, not a closure chain built up
//! front: `Next::run` advances the cursor by one and hands control to the
//! next middleware (or the final handler once the cursor reaches the end
//! of the list). A middleware that returns without calling `next.run(..)`
//! short-circuits the chain.

mod cache;
mod filter;
mod transform;

pub use cache::CacheMiddleware;
pub use filter::FilterMiddleware;
pub use transform::TransformMiddleware;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use rmcp::model::CallToolResult;
use serde_json::Value;

use crate::error::GatewayError;

/// The mutable call state threaded through the middleware chain.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub tool_name: String,
    pub arguments: Value,
    pub server: String,
}

pub type FinalHandler =
    Arc<dyn Fn(MiddlewareContext) -> BoxFuture<'static, Result<CallToolResult, GatewayError>> + Send + Sync>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        ctx: MiddlewareContext,
        next: Next,
    ) -> Result<CallToolResult, GatewayError>;

    fn name(&self) -> &str {
        "middleware"
    }
}

/// Continuation handed to a middleware: calling `run` advances to the
/// next entry in the chain, or to the final handler once exhausted.
#[derive(Clone)]
pub struct Next {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
    index: usize,
    final_handler: FinalHandler,
}

impl Next {
    pub async fn run(self, ctx: MiddlewareContext) -> Result<CallToolResult, GatewayError> {
        match self.middlewares.get(self.index) {
            Some(mw) => {
                tracing::trace!(middleware = mw.name(), tool = %ctx.tool_name, "entering middleware");
                let next = Next {
                    middlewares: self.middlewares.clone(),
                    index: self.index + 1,
                    final_handler: self.final_handler.clone(),
                };
                mw.handle(ctx, next).await
            }
            None => (self.final_handler)(ctx).await,
        }
    }
}

/// An ordered, immutable list of middlewares.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Run the chain to completion, dispatching to `final_handler` once
    /// every middleware has called through.
    pub async fn execute(
        &self,
        ctx: MiddlewareContext,
        final_handler: FinalHandler,
    ) -> Result<CallToolResult, GatewayError> {
        let next = Next {
            middlewares: self.middlewares.clone(),
            index: 0,
            final_handler,
        };
        next.run(ctx).await
    }
}

/// Build an MCP error result with a single text content block.
pub fn error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: Some(vec![rmcp::model::Content::text(message.into())]),
        is_error: Some(true),
        structured_content: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        label: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(
            &self,
            ctx: MiddlewareContext,
            next: Next,
        ) -> Result<CallToolResult, GatewayError> {
            self.order.lock().unwrap().push(self.label);
            let result = next.run(ctx).await;
            self.order
                .lock()
                .unwrap()
                .push(Box::leak(format!("{}-post", self.label).into_boxed_str()));
            result
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn handle(
            &self,
            _ctx: MiddlewareContext,
            _next: Next,
        ) -> Result<CallToolResult, GatewayError> {
            Ok(error_result("blocked"))
        }
    }

    fn ctx() -> MiddlewareContext {
        MiddlewareContext {
            tool_name: "t".into(),
            arguments: Value::Null,
            server: "s".into(),
        }
    }

    #[tokio::test]
    async fn pre_and_post_order_is_onion_shaped() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let a = Arc::new(Recorder {
            label: "a",
            order: order.clone(),
        });
        let b = Arc::new(Recorder {
            label: "b",
            order: order.clone(),
        });
        let chain = MiddlewareChain::new(vec![a, b]);
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let hc = handler_calls.clone();
        let handler: FinalHandler = Arc::new(move |_ctx| {
            hc.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(error_result("handled")) })
        });
        chain.execute(ctx(), handler).await.unwrap();
        assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
        let seen = order.lock().unwrap().clone();
        assert_eq!(seen, vec!["a", "b", "b-post", "a-post"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_final_handler() {
        let chain = MiddlewareChain::new(vec![Arc::new(ShortCircuit)]);
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let hc = handler_calls.clone();
        let handler: FinalHandler = Arc::new(move |_ctx| {
            hc.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(error_result("handled")) })
        });
        let result = chain.execute(ctx(), handler).await.unwrap();
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.is_error, Some(true));
    }
}
