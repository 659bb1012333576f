// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashMap;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::{serve_client, ServiceExt as _};
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

use super::{client_info, tool_to_info, BackendClient, ToolInfo};
use crate::error::GatewayError;

type ChildSession = RunningService<RoleClient, rmcp::model::ClientInfo>;

/// Backend reached by spawning a child process and speaking MCP over its
/// stdin/stdout.
pub struct StdioBackendClient {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    session: Mutex<Option<ChildSession>>,
    tool_cache: RwLock<Option<Vec<ToolInfo>>>,
}

impl StdioBackendClient {
    pub fn new(command: String, args: Vec<String>, env: HashMap<String, String>) -> Self {
        Self {
            name: command.clone(),
            command,
            args,
            env,
            session: Mutex::new(None),
            tool_cache: RwLock::new(None),
        }
    }
}

#[async_trait]
impl BackendClient for StdioBackendClient {
    async fn connect(&self) -> Result<(), GatewayError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            GatewayError::BackendCallFailure(format!(
                "failed to spawn stdio backend \"{}\": {e}",
                self.name
            ))
        })?;
        let service = serve_client(client_info(), transport).await.map_err(|e| {
            GatewayError::BackendCallFailure(format!(
                "failed to initialize stdio backend \"{}\": {e}",
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
        // Dropping the running service cancels its transport and, for a
        // stdio backend, kills the child process.
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
