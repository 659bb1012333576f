// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::aggregator::aggregate;
use crate::backend::{BackendClient, BackendConfig, ToolInfo};
use crate::error::GatewayError;
use crate::middleware::{error_result, MiddlewareChain, MiddlewareContext};
use crate::router::{Router, RoutingRule};

/// A point-in-time view of one backend's health and contribution to the
/// aggregated tool index.
#[derive(Debug, Clone)]
pub struct BackendSnapshot {
    pub name: String,
    pub connected: bool,
    pub tool_count: usize,
}

/// Declarative gateway configuration: the set of backends, the routing
/// table that dispatches tool names to them, and advertised identity.
pub struct GatewayConfig {
    pub name: String,
    pub version: String,
    pub servers: Vec<(String, BackendConfig)>,
    pub routing: Vec<RoutingRule>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "mcp-proxy".to_string(),
            version: "1.0.0".to_string(),
            servers: Vec::new(),
            routing: Vec::new(),
        }
    }
}

/// Owns the router, the backend connection pool, the middleware chain and
/// the aggregated tool index; orchestrates every `callTool`.
pub struct GatewayCore {
    name: String,
    version: String,
    router: Router,
    backends: HashMap<String, Arc<dyn BackendClient>>,
    backend_order: Vec<String>,
    middleware: MiddlewareChain,
    tool_index: RwLock<HashMap<String, ToolInfo>>,
}

impl GatewayCore {
    pub fn new(config: GatewayConfig, middleware: MiddlewareChain) -> Result<Self, GatewayError> {
        let router = Router::new(&config.routing)
            .map_err(|e| GatewayError::Middleware(format!("invalid routing pattern: {e}")))?;
        let backend_order: Vec<String> = config.servers.iter().map(|(n, _)| n.clone()).collect();
        let backends = config
            .servers
            .into_iter()
            .map(|(name, cfg)| (name, Arc::from(crate::backend::build_client(cfg))))
            .collect();
        Ok(Self {
            name: config.name,
            version: config.version,
            router,
            backends,
            backend_order,
            middleware,
            tool_index: RwLock::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Connect to every configured backend, then rebuild the tool index.
    /// Fails (and leaves the gateway unconnected) if any backend fails.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        for name in &self.backend_order {
            let backend = self.backends.get(name).expect("backend_order is in sync");
            backend.connect().await.map_err(|e| {
                GatewayError::BackendCallFailure(format!("backend \"{name}\" failed to connect: {e}"))
            })?;
        }
        self.refresh_tool_index().await
    }

    pub async fn refresh_tool_index(&self) -> Result<(), GatewayError> {
        let mut per_backend = Vec::with_capacity(self.backend_order.len());
        for name in &self.backend_order {
            let backend = self.backends.get(name).expect("backend_order is in sync");
            let tools = backend.list_tools().await?;
            per_backend.push((name.clone(), tools));
        }
        let merged = aggregate(&per_backend);
        let mut index = self.tool_index.write().await;
        index.clear();
        for tool in merged {
            index.insert(tool.name.clone(), tool);
        }
        Ok(())
    }

    /// Dispatch a tool call through routing and the middleware chain.
    /// Never returns a raw error to the caller: failures are converted to
    /// an `isError` MCP result.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        let server = match self.router.resolve(name) {
            Some(server) => server.to_string(),
            None => return error_result(format!("No routing rule matches tool \"{name}\"")),
        };

        let backend = match self.backends.get(&server) {
            Some(backend) => backend.clone(),
            None => return error_result(format!("Backend \"{server}\" not found")),
        };

        let ctx = MiddlewareContext {
            tool_name: name.to_string(),
            arguments,
            server: server.clone(),
        };

        let final_handler: crate::middleware::FinalHandler = Arc::new(move |ctx| {
            let backend = backend.clone();
            Box::pin(async move {
                backend
                    .call_tool(&ctx.tool_name, ctx.arguments)
                    .await
                    .map_err(|e| GatewayError::BackendCallFailure(e.to_string()))
            })
        });

        match self.middleware.execute(ctx, final_handler).await {
            Ok(result) => result,
            Err(e) => error_result(format!("Backend error: {e}")),
        }
    }

    /// Snapshot of every backend's connectivity and share of the
    /// aggregated tool index.
    pub async fn get_backends(&self) -> Vec<BackendSnapshot> {
        let index = self.tool_index.read().await;
        let mut snapshots = Vec::with_capacity(self.backend_order.len());
        for name in &self.backend_order {
            let backend = self.backends.get(name).expect("backend_order is in sync");
            let tool_count = index.values().filter(|t| &t.backend == name).count();
            snapshots.push(BackendSnapshot {
                name: name.clone(),
                connected: backend.connected().await,
                tool_count,
            });
        }
        snapshots
    }

    /// The current aggregated tool list, formatted for MCP's `tools/list`.
    /// Input schemas are passed through unchanged: the backend remains
    /// the authority on argument validation.
    pub async fn list_advertised_tools(&self) -> Vec<Tool> {
        let index = self.tool_index.read().await;
        let mut tools: Vec<&ToolInfo> = index.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
            .into_iter()
            .map(|t| {
                let schema = match &t.input_schema {
                    Value::Object(map) => map.clone(),
                    _ => serde_json::Map::new(),
                };
                Tool::new(
                    t.name.clone(),
                    t.description.clone().unwrap_or_default(),
                    Arc::new(schema),
                )
            })
            .collect()
    }

    /// Test-only seam for swapping in a mock `BackendClient` without going
    /// through `BackendConfig`/real transport construction.
    #[cfg(test)]
    pub fn insert_backend_for_test(&mut self, name: String, backend: Arc<dyn BackendClient>) {
        if !self.backend_order.contains(&name) {
            self.backend_order.push(name.clone());
        }
        self.backends.insert(name, backend);
    }

    pub async fn close(&self) -> Result<(), GatewayError> {
        for name in &self.backend_order {
            let backend = self.backends.get(name).expect("backend_order is in sync");
            backend.close().await?;
        }
        self.tool_index.write().await.clear();
        Ok(())
    }
}
