// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Abstract backend contract plus the two concrete transports (HTTP
//! streamable and stdio child-process) the gateway speaks to upstream MCP
//! servers with.

mod http;
mod stdio;

pub use http::HttpBackendClient;
pub use stdio::StdioBackendClient;

use std::collections::HashMap;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Declarative configuration for one backend. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

/// A tool as advertised by a single backend, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub backend: String,
}

/// Abstract contract every backend transport variant implements.
///
/// Implementations use interior mutability (`&self`, not `&mut self`)
/// because a single backend client is shared across concurrently
/// executing tool calls.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn connect(&self) -> Result<(), GatewayError>;
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, GatewayError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, GatewayError>;
    async fn close(&self) -> Result<(), GatewayError>;
    async fn connected(&self) -> bool;
    /// Drop the memoized tool list so the next `list_tools` re-queries.
    async fn invalidate_tool_cache(&self);
}

/// Build the concrete client for a backend's declared configuration.
pub fn build_client(config: BackendConfig) -> Box<dyn BackendClient> {
    match config {
        BackendConfig::Http { url, headers } => Box::new(HttpBackendClient::new(url, headers)),
        BackendConfig::Stdio { command, args, env } => {
            Box::new(StdioBackendClient::new(command, args, env))
        }
    }
}

pub(crate) fn client_info() -> rmcp::model::ClientInfo {
    rmcp::model::ClientInfo {
        meta: None,
        protocol_version: rmcp::model::ProtocolVersion::LATEST,
        capabilities: rmcp::model::ClientCapabilities::default(),
        client_info: rmcp::model::Implementation {
            name: "mcp-gateway".to_string(),
            title: Some("MCP Aggregating Gateway".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            icons: None,
            website_url: None,
        },
    }
}

pub(crate) fn tool_to_info(tool: rmcp::model::Tool, backend: &str) -> ToolInfo {
    ToolInfo {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
        backend: backend.to_string(),
    }
}
