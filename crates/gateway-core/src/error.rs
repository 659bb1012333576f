// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use thiserror::Error;

/// Internal error taxonomy for the gateway core.
///
/// `GatewayCore::call_tool` never lets one of these escape to a caller as a
/// Rust `Err` — they are always converted to an MCP error-shaped
/// `CallToolResult` at the boundary (see `gateway.rs`).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no routing rule matches tool \"{0}\"")]
    RouteNotFound(String),

    #[error("backend \"{0}\" not found")]
    BackendNotFound(String),

    #[error("backend call failed: {0}")]
    BackendCallFailure(String),

    #[error("tool \"{tool}\" is denied by filter policy")]
    FilterDenied { tool: String },

    #[error("cache store failure: {0}")]
    CacheStoreFailure(String),

    #[error("middleware error: {0}")]
    Middleware(String),
}

impl GatewayError {
    /// Whether this error should be treated as a client-facing denial
    /// rather than an upstream/backend fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::RouteNotFound(_) | GatewayError::FilterDenied { .. }
        )
    }
}
