// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::Instrument;

use crate::collector::Collector;
use crate::event::ToolCallEvent;

#[derive(Debug, Clone)]
pub struct HandlerWrapperConfig {
    pub sample_rate: f64,
    pub tracing_enabled: bool,
}

impl Default for HandlerWrapperConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            tracing_enabled: false,
        }
    }
}

pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

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

/// Wraps a per-tool handler so every invocation records a `ToolCallEvent`,
/// regardless of sampling. Sampling only gates whether the call runs
/// inside a tracing span, so downstream traced calls become its children.
pub fn wrap_handler(
    tool_name: impl Into<String>,
    handler: ToolHandler,
    config: HandlerWrapperConfig,
    collector: Arc<Collector>,
) -> ToolHandler {
    let tool_name = tool_name.into();
    Arc::new(move |arguments: Value| {
        let handler = handler.clone();
        let tool_name = tool_name.clone();
        let config = config.clone();
        let collector = collector.clone();
        Box::pin(async move {
            let input_size = encoded_len(&arguments);
            let start = Instant::now();

            let sampled = sample(config.sample_rate);
            let span = (sampled && config.tracing_enabled)
                .then(|| tracing::info_span!("mcp_tool_handler", tool = %tool_name, error = tracing::field::Empty));

            let result = match span.clone() {
                Some(span) => handler(arguments).instrument(span).await,
                None => handler(arguments).await,
            };

            let duration_ms = start.elapsed().as_millis() as u64;
            let event = match &result {
                Ok(value) => ToolCallEvent::success(
                    tool_name.clone(),
                    None,
                    now_ms(),
                    duration_ms,
                    input_size,
                    encoded_len(value),
                ),
                Err(message) => {
                    if let Some(span) = &span {
                        span.record("error", true);
                    }
                    ToolCallEvent::failure(
                        tool_name.clone(),
                        None,
                        now_ms(),
                        duration_ms,
                        input_size,
                        0,
                        message.clone(),
                        None,
                    )
                }
            };
            collector.record(event).await;
            result
        })
    })
}
