// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashSet;

use crate::backend::ToolInfo;

/// Merge per-backend tool lists into a single deduplicated index.
///
/// Backends are visited in declaration order; a tool name already seen
/// from an earlier backend is dropped from a later one. This is a plain
/// first-wins merge, not a namespacing scheme.
pub fn aggregate(backends: &[(String, Vec<ToolInfo>)]) -> Vec<ToolInfo> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for (_backend, tools) in backends {
        for tool in tools {
            if seen.insert(tool.name.clone()) {
                merged.push(tool.clone());
            }
        }
    }
    merged
}
