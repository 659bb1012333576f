// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use async_trait::async_trait;
use gateway_glob::GlobSet;
use rmcp::model::CallToolResult;

use super::{error_result, Middleware, MiddlewareContext, Next};
use crate::error::GatewayError;

/// Allows or denies tool calls by glob pattern.
///
/// A tool is denied if any `deny` pattern matches its name; otherwise, if
/// `allow` is non-empty, the name must match at least one `allow` pattern.
pub struct FilterMiddleware {
    allow: GlobSet,
    deny: GlobSet,
}

impl FilterMiddleware {
    pub fn new(allow: GlobSet, deny: GlobSet) -> Self {
        Self { allow, deny }
    }

    fn is_denied(&self, tool_name: &str) -> bool {
        if self.deny.matches(tool_name) {
            return true;
        }
        !self.allow.is_empty() && !self.allow.matches(tool_name)
    }
}

#[async_trait]
impl Middleware for FilterMiddleware {
    async fn handle(
        &self,
        ctx: MiddlewareContext,
        next: Next,
    ) -> Result<CallToolResult, GatewayError> {
        if self.is_denied(&ctx.tool_name) {
            tracing::debug!(tool = %ctx.tool_name, "tool call denied by filter middleware");
            return Ok(error_result(format!(
                "Tool \"{}\" is denied by filter policy",
                ctx.tool_name
            )));
        }
        next.run(ctx).await
    }

    fn name(&self) -> &str {
        "filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareChain;
    use serde_json::Value;
    use std::sync::{atomic::AtomicUsize, atomic::Ordering, Arc};

    fn ctx(tool_name: &str) -> MiddlewareContext {
        MiddlewareContext {
            tool_name: tool_name.to_string(),
            arguments: Value::Null,
            server: "s".into(),
        }
    }

    fn counting_handler() -> (super::super::FinalHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let handler: super::super::FinalHandler = Arc::new(move |_ctx| {
            c.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(error_result("ok")) })
        });
        (handler, calls)
    }

    #[tokio::test]
    async fn deny_blocks_without_calling_next() {
        let mw = FilterMiddleware::new(
            GlobSet::compile(&[]).unwrap(),
            GlobSet::compile(&["danger*".to_string()]).unwrap(),
        );
        let chain = MiddlewareChain::new(vec![Arc::new(mw)]);
        let (handler, calls) = counting_handler();
        let result = chain.execute(ctx("danger_rm"), handler).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allow_list_restricts_to_listed_names() {
        let mw = FilterMiddleware::new(
            GlobSet::compile(&["safe_*".to_string()]).unwrap(),
            GlobSet::compile(&[]).unwrap(),
        );
        let chain = MiddlewareChain::new(vec![Arc::new(mw)]);
        let (handler, calls) = counting_handler();
        chain.execute(ctx("safe_ping"), handler).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mw = FilterMiddleware::new(
            GlobSet::compile(&["safe_*".to_string()]).unwrap(),
            GlobSet::compile(&[]).unwrap(),
        );
        let chain = MiddlewareChain::new(vec![Arc::new(mw)]);
        let (handler, calls) = counting_handler();
        let result = chain.execute(ctx("other"), handler).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
