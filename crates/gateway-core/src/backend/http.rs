// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashMap;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::serve_client;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use tokio::sync::{Mutex, RwLock};

use super::{client_info, tool_to_info, BackendClient, ToolInfo};
use crate::error::GatewayError;

type HttpSession = RunningService<RoleClient, rmcp::model::ClientInfo>;

/// Backend reached over MCP's streamable HTTP transport.
pub struct HttpBackendClient {
    name: String,
    url: String,
    headers: HashMap<String, String>,
    session: Mutex<Option<HttpSession>>,
    tool_cache: RwLock<Option<Vec<ToolInfo>>>,
}

impl HttpBackendClient {
    pub fn new(url: String, headers: HashMap<String, String>) -> Self {
        Self {
            name: url.clone(),
            url,
            headers,
            session: Mutex::new(None),
            tool_cache: RwLock::new(None),
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn connect(&self) -> Result<(), GatewayError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let mut config = StreamableHttpClientTransportConfig::with_uri(self.url.as_str());
        if let Some(token) = self.headers.get("Authorization") {
            config = config.auth_header(token.clone());
        }
        let transport = StreamableHttpClientTransport::from_config(config);
        let service = serve_client(client_info(), transport).await.map_err(|e| {
            GatewayError::BackendCallFailure(format!(
                "failed to initialize http backend \"{}\": {e}",
                self.name
            ))
        })?;
        *guard = Some(service);
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, GatewayError> {
        if let Some(cached) = self.tool_cache.read().await.clone() {
            return Ok(cached);
        }
        let guard = self.session.lock().await;
        let service = guard.as_ref().ok_or_else(|| {
            GatewayError::BackendCallFailure(format!("backend \"{}\" not connected", self.name))
        })?;
        let tools = service.peer().list_all_tools().await.map_err(|e| {
            GatewayError::BackendCallFailure(format!(
                "listing tools from \"{}\" failed: {e}",
                self.name
            ))
        })?;
        let tools: Vec<ToolInfo> = tools
            .into_iter()
            .map(|t| tool_to_info(t, &self.name))
            .collect();
        *self.tool_cache.write().await = Some(tools.clone());
        Ok(tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, GatewayError> {
        let guard = self.session.lock().await;
        let service = guard.as_ref().ok_or_else(|| {
            GatewayError::BackendCallFailure(format!("backend \"{}\" not connected", self.name))
        })?;
        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => {
                return Err(GatewayError::BackendCallFailure(format!(
                    "tool arguments must be an object, got {other}"
                )))
            }
        };
        service
            .peer()
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| GatewayError::BackendCallFailure(e.to_string()))
    }

    async fn close(&self) -> Result<(), GatewayError> {
        let mut guard = self.session.lock().await;
        drop(guard.take());
        *self.tool_cache.write().await = None;
        Ok(())
    }

    async fn connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn invalidate_tool_cache(&self) {
        *self.tool_cache.write().await = None;
    }
}
