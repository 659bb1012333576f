// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::collector::Collector;
use crate::event::ToolCallEvent;

/// JSON-RPC request ids are either numbers or strings; this normalizes
/// both into a hashable key for the pending map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RpcId {
    Number(i64),
    Text(String),
}

impl RpcId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RpcId::Number),
            Value::String(s) => Some(RpcId::Text(s.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    PerCall,
    PerSession,
}

#[derive(Debug, Clone)]
pub struct SamplingConfig {
    pub sample_rate: f64,
    pub strategy: SamplingStrategy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            strategy: SamplingStrategy::PerCall,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterceptorConfig {
    pub sampling: SamplingConfig,
    pub tracing_enabled: bool,
}

struct PendingCall {
    tool_name: String,
    session_id: Option<String>,
    start: Instant,
    input_size: usize,
    // `tracing::Span` construction is synchronous in this ecosystem, so
    // there is no separate in-flight-initialization state to track; the
    // span (when present) is simply held until the call resolves.
    span: Option<tracing::Span>,
}

/// Observes JSON-RPC traffic exchanged over an MCP transport and turns
/// matched `tools/call` request/response pairs into `ToolCallEvent`s fed
/// to a `Collector`. Deliberately decoupled from any concrete transport
/// type: callers feed it raw JSON-RPC messages as they cross the wire.
pub struct TransportInterceptor {
    config: InterceptorConfig,
    collector: Arc<Collector>,
    pending: Mutex<HashMap<RpcId, PendingCall>>,
    session_sampling: Mutex<HashMap<String, bool>>,
}

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

fn encoded_len(value: &Value) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

impl TransportInterceptor {
    pub fn new(config: InterceptorConfig, collector: Arc<Collector>) -> Self {
        Self {
            config,
            collector,
            pending: Mutex::new(HashMap::new()),
            session_sampling: Mutex::new(HashMap::new()),
        }
    }

    async fn should_sample(&self, session_id: Option<&str>) -> bool {
        match self.config.sampling.strategy {
            SamplingStrategy::PerCall => sample(self.config.sampling.sample_rate),
            SamplingStrategy::PerSession => {
                let key = session_id.unwrap_or("unknown").to_string();
                let mut cache = self.session_sampling.lock().await;
                *cache
                    .entry(key)
                    .or_insert_with(|| sample(self.config.sampling.sample_rate))
            }
        }
    }

    /// Observe an outgoing message. Non-`tools/call` requests (and
    /// responses, notifications, anything without a recognized id) pass
    /// through untouched from the interceptor's point of view.
    pub async fn observe_request(&self, session_id: Option<&str>, message: &Value) {
        let Some(method) = message.get("method").and_then(Value::as_str) else {
            return;
        };
        if method != "tools/call" {
            return;
        }
        let Some(id) = message.get("id").and_then(RpcId::from_value) else {
            return;
        };
        if !self.should_sample(session_id).await {
            return;
        }

        let params = message.get("params");
        let tool_name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let input_size = params
            .and_then(|p| p.get("arguments"))
            .map(encoded_len)
            .unwrap_or(0);
        let span = self
            .config
            .tracing_enabled
            .then(|| tracing::info_span!("mcp_tool_call", tool = %tool_name));

        let pending = PendingCall {
            tool_name,
            session_id: session_id.map(str::to_string),
            start: Instant::now(),
            input_size,
            span,
        };
        self.pending.lock().await.insert(id, pending);
    }

    /// Observe an incoming message. If its id matches a pending call,
    /// records a `ToolCallEvent` and closes the call's span.
    pub async fn observe_response(&self, message: &Value) {
        let Some(id) = message.get("id").and_then(RpcId::from_value) else {
            return;
        };
        let pending = self.pending.lock().await.remove(&id);
        let Some(pending) = pending else {
            return;
        };

        let duration_ms = pending.start.elapsed().as_millis() as u64;
        let event = if let Some(result) = message.get("result") {
            ToolCallEvent::success(
                pending.tool_name,
                pending.session_id,
                now_ms(),
                duration_ms,
                pending.input_size,
                encoded_len(result),
            )
        } else if let Some(error) = message.get("error") {
            let error_message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let error_code = error.get("code").map(|c| c.to_string());
            ToolCallEvent::failure(
                pending.tool_name,
                pending.session_id,
                now_ms(),
                duration_ms,
                pending.input_size,
                encoded_len(error),
                error_message,
                error_code,
            )
        } else {
            ToolCallEvent::success(
                pending.tool_name,
                pending.session_id,
                now_ms(),
                duration_ms,
                pending.input_size,
                0,
            )
        };
        // The span is entered implicitly by nothing here: it exists only
        // to parent any tracing emitted by the backend call itself, and
        // is closed simply by dropping it.
        drop(pending.span);
        self.collector.record(event).await;
    }

    /// Drain all pending calls as failures and clear the per-session
    /// sampling cache. Call this when the wrapped transport closes.
    pub async fn on_close(&self) {
        let drained: Vec<PendingCall> = self.pending.lock().await.drain().map(|(_, v)| v).collect();
        for pending in drained {
            let duration_ms = pending.start.elapsed().as_millis() as u64;
            drop(pending.span);
            let event = ToolCallEvent::failure(
                pending.tool_name,
                pending.session_id,
                now_ms(),
                duration_ms,
                pending.input_size,
                0,
                "Transport closed before tool response",
                None,
            );
            self.collector.record(event).await;
        }
        self.session_sampling.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorConfig;
    use crate::exporter::{ExportError, Exporter};
    use async_trait::async_trait;
    use serde_json::json;

    struct NullExporter;

    #[async_trait]
    impl Exporter for NullExporter {
        async fn export(&self, _batch: &[ToolCallEvent]) -> Result<(), ExportError> {
            Ok(())
        }
    }

    fn collector() -> Arc<Collector> {
        Collector::new(
            CollectorConfig {
                max_buffer_size: 100,
                tool_window_size: 64,
                flush_interval_ms: 0,
            },
            Arc::new(NullExporter),
        )
    }

    fn config(strategy: SamplingStrategy, sample_rate: f64) -> InterceptorConfig {
        InterceptorConfig {
            sampling: SamplingConfig {
                sample_rate,
                strategy,
            },
            tracing_enabled: false,
        }
    }

    #[tokio::test]
    async fn matched_success_response_records_event() {
        let collector = collector();
        let interceptor =
            TransportInterceptor::new(config(SamplingStrategy::PerCall, 1.0), collector.clone());

        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "echo", "arguments": {"x": 1}}});
        interceptor.observe_request(Some("sess-1"), &request).await;

        let response = json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}});
        interceptor.observe_response(&response).await;

        let stats = collector.tool_stats("echo").await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.error_count, 0);
    }

    #[tokio::test]
    async fn error_response_is_recorded_as_failure() {
        let collector = collector();
        let interceptor =
            TransportInterceptor::new(config(SamplingStrategy::PerCall, 1.0), collector.clone());

        let request = json!({"jsonrpc": "2.0", "id": "a", "method": "tools/call", "params": {"name": "fail"}});
        interceptor.observe_request(None, &request).await;

        let response = json!({"jsonrpc": "2.0", "id": "a", "error": {"code": -32000, "message": "boom"}});
        interceptor.observe_response(&response).await;

        let stats = collector.tool_stats("fail").await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test]
    async fn non_call_methods_are_ignored() {
        let collector = collector();
        let interceptor =
            TransportInterceptor::new(config(SamplingStrategy::PerCall, 1.0), collector.clone());

        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
        interceptor.observe_request(None, &request).await;
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}});
        interceptor.observe_response(&response).await;

        assert_eq!(collector.snapshot().await.total_calls, 0);
    }

    #[tokio::test]
    async fn per_session_sampling_is_sticky() {
        let collector = collector();
        let interceptor =
            TransportInterceptor::new(config(SamplingStrategy::PerSession, 0.0), collector.clone());

        for i in 0..3 {
            let request = json!({"jsonrpc": "2.0", "id": i, "method": "tools/call", "params": {"name": "t"}});
            interceptor.observe_request(Some("sticky"), &request).await;
        }
        // sample_rate 0.0 means the session is decided "do not sample" once
        // and stays that way: nothing should ever enter the pending map.
        assert_eq!(interceptor.pending.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn teardown_drains_pending_calls_as_failures() {
        let collector = collector();
        let interceptor =
            TransportInterceptor::new(config(SamplingStrategy::PerCall, 1.0), collector.clone());

        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "orphan"}});
        interceptor.observe_request(Some("sess"), &request).await;

        interceptor.on_close().await;

        let stats = collector.tool_stats("orphan").await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(interceptor.pending.lock().await.len(), 0);
    }
}
