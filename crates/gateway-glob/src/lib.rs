// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Anchored glob matching used by the router and the filter middleware.
//!
//! Patterns support exactly two wildcards: `*` (any run of characters,
//! including none) and `?` (exactly one character). Matching is always
//! whole-string; there is no partial or path-segment matching and no
//! escape syntax inside patterns.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlobError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Compile {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled glob pattern, anchored to match an entire string.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    pub fn compile(pattern: &str) -> Result<Self, GlobError> {
        let translated = translate(pattern);
        let regex = Regex::new(&translated).map_err(|source| GlobError::Compile {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

/// Translate a `*`/`?` glob into an anchored regex source string.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' => {
                flush_literal(&mut out, &mut literal);
                out.push_str(".*");
            }
            '?' => {
                flush_literal(&mut out, &mut literal);
                out.push('.');
            }
            other => literal.push(other),
        }
    }
    flush_literal(&mut out, &mut literal);
    out.push('$');
    out
}

fn flush_literal(out: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        out.push_str(&regex::escape(literal));
        literal.clear();
    }
}

/// Compile `allow`/`deny` glob lists and test against either.
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    globs: Vec<Glob>,
}

impl GlobSet {
    pub fn compile(patterns: &[String]) -> Result<Self, GlobError> {
        let globs = patterns
            .iter()
            .map(|p| Glob::compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { globs })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.globs.iter().any(|g| g.is_match(candidate))
    }
}
