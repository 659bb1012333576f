// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Stable canonical encoding of JSON values for content-addressed cache keys.
//!
//! Object keys are sorted ascending by Unicode code point; array order is
//! preserved. Two structurally-equal-but-differently-ordered objects
//! produce byte-identical output.

use serde_json::Value;
use std::fmt::Write as _;

pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(&Value::String((*key).clone()), out);
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// Build the cache key for a `(tool, arguments)` pair.
pub fn cache_key(tool: &str, arguments: &Value) -> String {
    let mut out = String::new();
    write_canonical(&Value::String(tool.to_string()), &mut out);
    out.push(':');
    write_canonical(arguments, &mut out);
    out
}
