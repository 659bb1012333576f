// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

/// An MCP gateway that aggregates multiple backend servers behind one
/// endpoint and records per-call analytics.
#[derive(Debug, Parser)]
#[command(name = "mcp-gateway", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the gateway's HTTP listener.
    Serve(Serve),
}

#[derive(Debug, Clone, Default, Parser, Serialize)]
pub struct Serve {
    /// Path to a TOML configuration file. Defaults to
    /// `$XDG_CONFIG_HOME/mcp-gateway/config.toml`.
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Address the HTTP listener binds to.
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Analytics exporter: "console", "json", or "otlp".
    #[arg(long)]
    pub exporter: Option<String>,

    /// Fraction of tool calls to sample for analytics, in [0, 1].
    #[arg(long)]
    pub sample_rate: Option<f64>,

    /// Milliseconds between periodic analytics flushes; 0 disables the timer.
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Analytics sampling strategy: "per_call" or "per_session".
    #[arg(long)]
    pub sampling_strategy: Option<String>,

    /// Enable tracing spans around sampled tool calls.
    #[arg(long)]
    pub tracing: Option<bool>,
}
