// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use gateway_core::GatewayCore;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use serde_json::json;

use crate::error::ListenerError;
use crate::server::{GatewayAnalytics, GatewayServer};

/// Request bodies larger than this are rejected before they reach the
/// session transport.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Build the full axum router for the gateway: `/mcp` (session transport),
/// `/health`, and a JSON 404 fallback. Body-size limiting and JSON-body
/// validation happen in `enforce_body_limits`, layered in front of the
/// nested `StreamableHttpService`. The session lifecycle itself (the
/// `New -> Initialized(id) -> Closing -> Gone` state machine) and the
/// streamable-HTTP/SSE wire framing are owned by rmcp's
/// `StreamableHttpService`/`LocalSessionManager`; this listener adds the
/// behavior around that boundary.
pub fn build_router(core: Arc<GatewayCore>) -> Router {
    build_router_with_analytics(core, None)
}

/// Same as [`build_router`], but instruments every `call_tool` with the
/// given analytics hook when present.
pub fn build_router_with_analytics(
    core: Arc<GatewayCore>,
    analytics: Option<GatewayAnalytics>,
) -> Router {
    let service = StreamableHttpService::new(
        move || {
            Ok(match analytics.clone() {
                Some(analytics) => GatewayServer::with_analytics(core.clone(), analytics),
                None => GatewayServer::new(core.clone()),
            })
        },
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mcp = Router::new()
        .nest_service("/mcp", service)
        .layer(middleware::from_fn(enforce_body_limits));

    Router::new()
        .merge(mcp)
        .route("/health", get(health))
        .fallback(not_found)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Reject oversized bodies with a 413 and malformed JSON POST bodies with
/// a 400, both using the gateway's JSON error envelope, before handing a
/// well-formed request through to the session transport.
async fn enforce_body_limits(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES + 1).await {
        Ok(bytes) => bytes,
        Err(_) => return ListenerError::BodyTooLarge.into_response(),
    };

    if bytes.len() > MAX_BODY_BYTES {
        return ListenerError::BodyTooLarge.into_response();
    }

    if method == Method::POST
        && !bytes.is_empty()
        && serde_json::from_slice::<serde_json::Value>(&bytes).is_err()
    {
        return ListenerError::InvalidJson.into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}
