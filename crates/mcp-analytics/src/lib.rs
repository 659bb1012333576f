// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod collector;
pub mod event;
pub mod exporter;
pub mod handler_wrapper;
pub mod interceptor;
pub mod stats;

pub use collector::{Collector, CollectorConfig};
pub use event::ToolCallEvent;
pub use exporter::{ConsoleExporter, CustomExporterAdapter, ExportError, Exporter, JsonLinesExporter, OtlpExporter};
pub use handler_wrapper::{wrap_handler, HandlerWrapperConfig, ToolHandler};
pub use interceptor::{InterceptorConfig, SamplingConfig, SamplingStrategy, TransportInterceptor};
pub use stats::{AnalyticsSnapshot, SessionStats, ToolStats};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingExporter {
        batches: Arc<tokio::sync::Mutex<Vec<Vec<ToolCallEvent>>>>,
    }

    #[async_trait]
    impl Exporter for RecordingExporter {
        async fn export(&self, batch: &[ToolCallEvent]) -> Result<(), ExportError> {
            self.batches.lock().await.push(batch.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn interceptor_feeds_collector_which_flushes_to_exporter() {
        let batches = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let exporter = Arc::new(RecordingExporter {
            batches: batches.clone(),
        });
        let collector = Collector::new(
            CollectorConfig {
                max_buffer_size: 100,
                tool_window_size: 64,
                flush_interval_ms: 0,
            },
            exporter,
        );
        let interceptor = TransportInterceptor::new(
            InterceptorConfig {
                sampling: SamplingConfig {
                    sample_rate: 1.0,
                    strategy: SamplingStrategy::PerCall,
                },
                tracing_enabled: false,
            },
            collector.clone(),
        );

        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "search", "arguments": {"q": "rust"}}});
        interceptor.observe_request(Some("session-a"), &request).await;
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": {"hits": 3}});
        interceptor.observe_response(&response).await;

        collector.flush().await.unwrap();

        let flushed = batches.lock().await;
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].len(), 1);
        assert_eq!(flushed[0][0].tool_name, "search");
        assert_eq!(flushed[0][0].session_id.as_deref(), Some("session-a"));
    }

    #[tokio::test]
    async fn handler_wrapper_and_collector_agree_on_counts() {
        let batches = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let exporter = Arc::new(RecordingExporter {
            batches: batches.clone(),
        });
        let collector = Collector::new(CollectorConfig::default(), exporter);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let inner: ToolHandler = Arc::new(move |args| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(args) })
        });
        let wrapped = wrap_handler(
            "lookup",
            inner,
            HandlerWrapperConfig::default(),
            collector.clone(),
        );

        for _ in 0..5 {
            wrapped(json!({})).await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let stats = collector.tool_stats("lookup").await.unwrap();
        assert_eq!(stats.count, 5);
    }
}
