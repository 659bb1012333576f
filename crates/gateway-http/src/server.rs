// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use gateway_core::GatewayCore;
use mcp_analytics::{Collector, ToolCallEvent};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorData, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ServerHandler;
use tracing::Instrument;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn sample(rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    rand::random::<f64>() < rate
}

/// Per-tool-call instrumentation hook (the handler-wrapper instrumentation
/// style, applied at the gateway's single `call_tool` entry point rather
/// than per backend tool). Every call is recorded regardless of sampling;
/// sampling only decides whether the call runs inside a tracing span.
#[derive(Clone)]
pub struct GatewayAnalytics {
    pub collector: Arc<Collector>,
    pub sample_rate: f64,
    pub tracing_enabled: bool,
}

/// Re-exports every tool in the gateway's aggregated index under a single
/// MCP server identity, routing each `call_tool` back into `GatewayCore`.
#[derive(Clone)]
pub struct GatewayServer {
    core: Arc<GatewayCore>,
    analytics: Option<GatewayAnalytics>,
}

impl GatewayServer {
    pub fn new(core: Arc<GatewayCore>) -> Self {
        Self {
            core,
            analytics: None,
        }
    }

    pub fn with_analytics(core: Arc<GatewayCore>, analytics: GatewayAnalytics) -> Self {
        Self {
            core,
            analytics: Some(analytics),
        }
    }
}

impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation {
                name: self.core.name().to_string(),
                version: self.core.version().to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn call_tool<'a>(
        &'a self,
        params: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            let arguments = params
                .arguments
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);
            let tool_name = params.name.to_string();

            let Some(analytics) = self.analytics.clone() else {
                return Ok(self.core.call_tool(&tool_name, arguments).await);
            };

            let input_size = serde_json::to_string(&arguments).map(|s| s.len()).unwrap_or(0);
            let start = Instant::now();
            let sampled = sample(analytics.sample_rate);
            let span = (sampled && analytics.tracing_enabled)
                .then(|| tracing::info_span!("mcp_tool_call", tool = %tool_name));

            let result = match span {
                Some(span) => self.core.call_tool(&tool_name, arguments).instrument(span).await,
                None => self.core.call_tool(&tool_name, arguments).await,
            };

            let duration_ms = start.elapsed().as_millis() as u64;
            let output_size = serde_json::to_string(&result.content)
                .map(|s| s.len())
                .unwrap_or(0);
            let event = if result.is_error == Some(true) {
                ToolCallEvent::failure(
                    tool_name,
                    None,
                    now_ms(),
                    duration_ms,
                    input_size,
                    output_size,
                    "tool call returned an error result",
                    None,
                )
            } else {
                ToolCallEvent::success(tool_name, None, now_ms(), duration_ms, input_size, output_size)
            };
            analytics.collector.record(event).await;

            Ok(result)
        })
    }

    fn list_tools<'a>(
        &'a self,
        _params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ListToolsResult, ErrorData>> + Send + 'a>> {
        Box::pin(async move {
            Ok(ListToolsResult {
                tools: self.core.list_advertised_tools().await,
                next_cursor: None,
            })
        })
    }
}
