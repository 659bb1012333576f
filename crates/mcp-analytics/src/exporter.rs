// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::event::ToolCallEvent;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("exporter failed: {0}")]
    Failed(String),
}

/// Delivery contract for a batch of events. A throw/error is treated as
/// transient by the collector: the batch is re-queued and retried on the
/// next flush.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, batch: &[ToolCallEvent]) -> Result<(), ExportError>;
}

/// Logs each batch with `tracing`. Never fails.
pub struct ConsoleExporter;

#[async_trait]
impl Exporter for ConsoleExporter {
    async fn export(&self, batch: &[ToolCallEvent]) -> Result<(), ExportError> {
        for event in batch {
            tracing::info!(
                tool = %event.tool_name,
                session = event.session_id.as_deref().unwrap_or("-"),
                duration_ms = event.duration_ms,
                success = event.success,
                "tool call recorded"
            );
        }
        Ok(())
    }
}

/// Appends each event as one JSON line to a file. Opens and closes the
/// file per batch, so it tolerates the file being rotated between flushes.
pub struct JsonLinesExporter {
    path: std::path::PathBuf,
}

impl JsonLinesExporter {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Exporter for JsonLinesExporter {
    async fn export(&self, batch: &[ToolCallEvent]) -> Result<(), ExportError> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ExportError::Failed(e.to_string()))?;

        for event in batch {
            let mut line = serde_json::to_string(event).map_err(|e| ExportError::Failed(e.to_string()))?;
            line.push('\n');
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| ExportError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

/// The OTLP exporter is an external collaborator: its wire protocol and
/// endpoint negotiation are out of scope. Selecting it without the
/// `otlp` feature produces a clear error instead of silently falling
/// back to another exporter.
pub struct OtlpExporter;

#[async_trait]
impl Exporter for OtlpExporter {
    async fn export(&self, _batch: &[ToolCallEvent]) -> Result<(), ExportError> {
        Err(ExportError::Failed(
            "analytics exporter \"otlp\" requires building with the `otlp` feature".to_string(),
        ))
    }
}

/// Adapts a user-supplied closure into an `Exporter`. Any error the
/// closure returns is logged and swallowed: a bug in custom export code
/// must never stall the collector's flush loop.
pub struct CustomExporterAdapter<F> {
    inner: F,
}

impl<F> CustomExporterAdapter<F>
where
    F: Fn(&[ToolCallEvent]) -> Result<(), String> + Send + Sync,
{
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<F> Exporter for CustomExporterAdapter<F>
where
    F: Fn(&[ToolCallEvent]) -> Result<(), String> + Send + Sync,
{
    async fn export(&self, batch: &[ToolCallEvent]) -> Result<(), ExportError> {
        if let Err(message) = (self.inner)(batch) {
            warn!(error = %message, "custom analytics exporter failed; batch dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn custom_exporter_swallows_errors() {
        let exporter = CustomExporterAdapter::new(|_batch: &[ToolCallEvent]| Err("boom".to_string()));
        let event = ToolCallEvent::success("t", None, 0, 1, 0, 0);
        assert!(exporter.export(&[event]).await.is_ok());
    }

    #[tokio::test]
    async fn otlp_without_feature_errors_clearly() {
        let exporter = OtlpExporter;
        let err = exporter.export(&[]).await.unwrap_err();
        assert!(err.to_string().contains("otlp"));
    }
}
