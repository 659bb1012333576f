// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::Value;

use super::{Middleware, MiddlewareContext, Next};
use crate::error::GatewayError;

pub type BeforeHook = Box<dyn Fn(&mut MiddlewareContext) + Send + Sync>;
pub type AfterHook = Box<dyn Fn(&mut CallToolResult) + Send + Sync>;

/// Mutates the call context before dispatch and/or the result afterward.
#[derive(Default)]
pub struct TransformMiddleware {
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
}

impl TransformMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before(mut self, hook: BeforeHook) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn with_after(mut self, hook: AfterHook) -> Self {
        self.after = Some(hook);
        self
    }
}

#[async_trait]
impl Middleware for TransformMiddleware {
    async fn handle(
        &self,
        mut ctx: MiddlewareContext,
        next: Next,
    ) -> Result<CallToolResult, GatewayError> {
        if let Some(before) = &self.before {
            before(&mut ctx);
        }
        let mut result = next.run(ctx).await?;
        if let Some(after) = &self.after {
            after(&mut result);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "transform"
    }
}

/// Value-level convenience: replace `ctx.arguments` with the output of
/// `f(ctx.arguments)`.
pub fn rewrite_arguments(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> BeforeHook {
    Box::new(move |ctx| {
        ctx.arguments = f(&ctx.arguments);
    })
}
