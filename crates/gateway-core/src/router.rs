// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use gateway_glob::{Glob, GlobError};
use serde::{Deserialize, Serialize};

/// One routing rule: tool names matching `pattern` are sent to `server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub pattern: String,
    pub server: String,
}

struct CompiledRule {
    glob: Glob,
    server: String,
}

/// First-match-wins router over an ordered list of rules.
pub struct Router {
    rules: Vec<CompiledRule>,
}

impl Router {
    pub fn new(rules: &[RoutingRule]) -> Result<Self, GlobError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Glob::compile(&rule.pattern).map(|glob| CompiledRule {
                    glob,
                    server: rule.server.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Resolve a tool name to the name of the backend that should serve it.
    pub fn resolve(&self, tool_name: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.glob.is_match(tool_name))
            .map(|rule| rule.server.as_str())
    }
}
