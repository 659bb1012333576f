// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recorded tool invocation. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub tool_name: String,
    pub session_id: Option<String>,
    pub timestamp_ms: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub input_size: usize,
    pub output_size: usize,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ToolCallEvent {
    pub fn success(
        tool_name: impl Into<String>,
        session_id: Option<String>,
        timestamp_ms: u64,
        duration_ms: u64,
        input_size: usize,
        output_size: usize,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            session_id,
            timestamp_ms,
            duration_ms,
            success: true,
            error_message: None,
            error_code: None,
            input_size,
            output_size,
            metadata: HashMap::new(),
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        session_id: Option<String>,
        timestamp_ms: u64,
        duration_ms: u64,
        input_size: usize,
        output_size: usize,
        error_message: impl Into<String>,
        error_code: Option<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            session_id,
            timestamp_ms,
            duration_ms,
            success: false,
            error_message: Some(error_message.into()),
            error_code,
            input_size,
            output_size,
            metadata: HashMap::new(),
        }
    }
}
