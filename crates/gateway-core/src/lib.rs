// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Routing, caching, onion middleware, backend transports and the
//! orchestration that ties them together into a single MCP gateway.

pub mod aggregator;
pub mod backend;
pub mod cache;
pub mod canonical;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod router;

pub use backend::{BackendClient, BackendConfig, ToolInfo};
pub use cache::{CacheStore, InMemoryCacheStore};
pub use error::GatewayError;
pub use gateway::{BackendSnapshot, GatewayConfig, GatewayCore};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareContext};
pub use router::{Router, RoutingRule};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use rmcp::model::{CallToolResult, Content};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockBackend {
        calls: AtomicUsize,
        tools: Vec<ToolInfo>,
    }

    #[async_trait]
    impl BackendClient for MockBackend {
        async fn connect(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn list_tools(&self) -> Result<Vec<ToolInfo>, GatewayError> {
            Ok(self.tools.clone())
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: Value,
        ) -> Result<CallToolResult, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CallToolResult {
                content: Some(vec![Content::text(format!("called {name}"))]),
                is_error: None,
                structured_content: None,
            })
        }

        async fn close(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn connected(&self) -> bool {
            true
        }

        async fn invalidate_tool_cache(&self) {}
    }

    fn tool(name: &str) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            description: Some("a tool".to_string()),
            input_schema: json!({"type": "object"}),
            backend: "a".to_string(),
        }
    }

    async fn gateway_with_backend(
        backend: Arc<MockBackend>,
        routing: Vec<RoutingRule>,
    ) -> (GatewayCore, Arc<MockBackend>) {
        let config = GatewayConfig {
            name: "test-gateway".into(),
            version: "0.0.0".into(),
            servers: vec![],
            routing,
        };
        let mut core = GatewayCore::new(config, MiddlewareChain::default()).unwrap();
        // Directly inject the mock backend: `GatewayCore::new` builds real
        // transports from `BackendConfig`, which a unit test has no use for.
        inject_backend(&mut core, "a", backend.clone());
        (core, backend)
    }

    // Test-only seam: construct a gateway whose single backend is the
    // in-memory mock above, bypassing `BackendConfig` entirely.
    fn inject_backend(core: &mut GatewayCore, name: &str, backend: Arc<dyn BackendClient>) {
        core.insert_backend_for_test(name.to_string(), backend);
    }

    #[tokio::test]
    async fn routes_and_dispatches_to_matching_backend() {
        let backend = Arc::new(MockBackend {
            calls: AtomicUsize::new(0),
            tools: vec![tool("a_ping")],
        });
        let (core, backend) = gateway_with_backend(
            backend,
            vec![RoutingRule {
                pattern: "a_*".into(),
                server: "a".into(),
            }],
        )
        .await;
        let result = core.call_tool("a_ping", json!({})).await;
        assert_ne!(result.is_error, Some(true));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_tool_name_is_an_error_result_not_a_panic() {
        let backend = Arc::new(MockBackend {
            calls: AtomicUsize::new(0),
            tools: vec![],
        });
        let (core, _backend) = gateway_with_backend(backend, vec![]).await;
        let result = core.call_tool("anything", json!({})).await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn refresh_tool_index_aggregates_backend_tools() {
        let backend = Arc::new(MockBackend {
            calls: AtomicUsize::new(0),
            tools: vec![tool("a_ping"), tool("a_pong")],
        });
        let (core, _backend) = gateway_with_backend(backend, vec![]).await;
        core.refresh_tool_index().await.unwrap();
        let tools = core.list_advertised_tools().await;
        assert_eq!(tools.len(), 2);
    }
}
