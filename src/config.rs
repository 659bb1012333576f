// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::providers::{Env, Format, Serialized, Toml};
use gateway_core::backend::BackendConfig;
use gateway_core::router::RoutingRule;
use serde::{Deserialize, Serialize};

use crate::cli::Serve;

fn default_name() -> String {
    "mcp-proxy".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:9001".to_string()
}

fn default_exporter() -> String {
    "console".to_string()
}

fn default_sample_rate() -> f64 {
    1.0
}

fn default_flush_interval_ms() -> u64 {
    5_000
}

fn default_max_buffer_size() -> usize {
    10_000
}

fn default_tool_window_size() -> usize {
    2_048
}

fn default_sampling_strategy() -> String {
    "per_call".to_string()
}

/// Full configuration for the gateway and its analytics pipeline, loaded
/// by layering a TOML file, `MCP_GATEWAY_`-prefixed environment variables,
/// and CLI flags (highest precedence).
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Advertised server name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Advertised server version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Backend servers, keyed by the name routing rules reference.
    #[serde(default)]
    pub servers: HashMap<String, BackendConfig>,

    /// Ordered routing rules; evaluation order is list order.
    #[serde(default)]
    pub routing: Vec<RoutingRule>,

    /// Analytics exporter: "console", "json", or "otlp".
    #[serde(default = "default_exporter")]
    pub exporter: String,

    /// Path the "json" exporter appends JSON-lines events to.
    #[serde(default)]
    pub exporter_path: Option<PathBuf>,

    /// Fraction of tool calls to sample for analytics, in [0, 1].
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Milliseconds between periodic analytics flushes; 0 disables the timer.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Maximum number of recent events kept in the debug ring buffer.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Size of the per-tool recent-duration window used for percentiles.
    #[serde(default = "default_tool_window_size")]
    pub tool_window_size: usize,

    /// Analytics sampling strategy: "per_call" or "per_session".
    #[serde(default = "default_sampling_strategy")]
    pub sampling_strategy: String,

    /// Enable tracing spans around sampled tool calls.
    #[serde(default)]
    pub tracing: bool,

    /// Arbitrary metadata attached to every exported batch's context.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Config {
    /// Returns a new [`Config`] by merging a configuration file, environment
    /// variables prefixed `MCP_GATEWAY_`, and CLI-provided values, in that
    /// order of increasing precedence. The configuration file defaults to
    /// `$XDG_CONFIG_HOME/mcp-gateway/config.toml`, overridable by setting
    /// `MCP_GATEWAY_CONFIG_FILE`.
    pub fn new(cli_config: &Serve) -> Result<Self, anyhow::Error> {
        let config_file_path = match &cli_config.config {
            Some(path) => path.clone(),
            None => match std::env::var_os("MCP_GATEWAY_CONFIG_FILE") {
                Some(path) => PathBuf::from(path),
                None => etcetera::choose_base_strategy()
                    .context("Unable to get config directory")?
                    .config_dir()
                    .join("mcp-gateway")
                    .join("config.toml"),
            },
        };
        Self::new_from_path(cli_config, config_file_path)
    }

    /// Same as [`Config::new`], but with an explicit configuration file path.
    pub fn new_from_path(
        cli_config: &Serve,
        config_file_path: impl AsRef<Path>,
    ) -> Result<Self, anyhow::Error> {
        figment::Figment::new()
            .admerge(Toml::file(config_file_path))
            .admerge(Env::prefixed("MCP_GATEWAY_"))
            .admerge(Serialized::defaults(cli_config))
            .extract()
            .context("Unable to merge configuration")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn empty_cli() -> Serve {
        Serve::default()
    }

    #[test]
    fn missing_config_file_succeeds_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist.toml");

        let config = Config::new_from_path(&empty_cli(), &missing).unwrap();

        assert_eq!(config.name, "mcp-proxy");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.bind_address, "127.0.0.1:9001");
        assert_eq!(config.sample_rate, 1.0);
        assert_eq!(config.sampling_strategy, "per_call");
    }

    #[test]
    fn config_file_values_are_used() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(
            &config_file,
            r#"
name = "custom-proxy"
bind_address = "0.0.0.0:8080"
sample_rate = 0.25

[servers.search]
type = "http"
url = "https://example.invalid/mcp"

[[routing]]
pattern = "search.*"
server = "search"
"#,
        )
        .unwrap();

        let config = Config::new_from_path(&empty_cli(), &config_file).unwrap();

        assert_eq!(config.name, "custom-proxy");
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.sample_rate, 0.25);
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.routing.len(), 1);
        assert_eq!(config.routing[0].server, "search");
    }

    #[test]
    fn cli_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(&config_file, r#"bind_address = "0.0.0.0:8080""#).unwrap();

        let cli = Serve {
            bind_address: Some("192.168.1.1:9999".to_string()),
            ..Serve::default()
        };
        let config = Config::new_from_path(&cli, &config_file).unwrap();

        assert_eq!(config.bind_address, "192.168.1.1:9999");
    }

    #[test]
    fn env_var_overrides_config_file_but_not_cli() {
        temp_env::with_var("MCP_GATEWAY_BIND_ADDRESS", Some("10.0.0.5:7000"), || {
            let temp_dir = TempDir::new().unwrap();
            let config_file = temp_dir.path().join("config.toml");
            fs::write(&config_file, r#"bind_address = "0.0.0.0:8080""#).unwrap();

            let config = Config::new_from_path(&empty_cli(), &config_file).unwrap();
            assert_eq!(config.bind_address, "10.0.0.5:7000");
        });
    }

    #[test]
    fn invalid_toml_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("invalid.toml");
        fs::write(&config_file, "bind_address = unterminated").unwrap();

        assert!(Config::new_from_path(&empty_cli(), &config_file).is_err());
    }
}
