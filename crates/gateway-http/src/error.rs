// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Listener-level errors: these pick the HTTP status/JSON body, they are
/// never surfaced to an MCP client as a tool-call error.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Request body too large")]
    BodyTooLarge,
    #[error("Invalid JSON body")]
    InvalidJson,
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ListenerError {
    fn into_response(self) -> Response {
        let status = match self {
            ListenerError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ListenerError::InvalidJson => StatusCode::BAD_REQUEST,
            ListenerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
