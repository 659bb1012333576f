// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The `mcp-gateway(1)` command: an MCP aggregating gateway with a
//! built-in tool-call analytics pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gateway_core::{GatewayConfig, GatewayCore, MiddlewareChain};
use gateway_http::server::GatewayAnalytics;
use mcp_analytics::{
    Collector, CollectorConfig, ConsoleExporter, Exporter, JsonLinesExporter, OtlpExporter,
};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

mod cli;
mod config;

use cli::{Cli, Commands};
use config::Config;

fn build_exporter(config: &Config) -> Arc<dyn Exporter> {
    match config.exporter.as_str() {
        "json" => {
            let path = config
                .exporter_path
                .clone()
                .unwrap_or_else(|| "mcp-gateway-analytics.jsonl".into());
            Arc::new(JsonLinesExporter::new(path))
        }
        "otlp" => Arc::new(OtlpExporter),
        "console" => Arc::new(ConsoleExporter),
        other => {
            tracing::warn!(exporter = other, "unknown exporter, falling back to console");
            Arc::new(ConsoleExporter)
        }
    }
}

fn build_analytics(config: &Config) -> (Arc<Collector>, GatewayAnalytics) {
    let exporter = build_exporter(config);
    let collector = Collector::new(
        CollectorConfig {
            max_buffer_size: config.max_buffer_size,
            tool_window_size: config.tool_window_size,
            flush_interval_ms: config.flush_interval_ms,
        },
        exporter,
    );
    let analytics = GatewayAnalytics {
        collector: collector.clone(),
        sample_rate: config.sample_rate,
        tracing_enabled: config.tracing,
    };
    (collector, analytics)
}

async fn serve(serve_args: &cli::Serve) -> Result<()> {
    let config = Config::new(serve_args).context("loading configuration")?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway_config = GatewayConfig {
        name: config.name.clone(),
        version: config.version.clone(),
        servers: config.servers.clone().into_iter().collect(),
        routing: config.routing.clone(),
    };
    let core = Arc::new(GatewayCore::new(gateway_config, MiddlewareChain::default())?);
    core.connect().await.context("connecting to backends")?;

    let (collector, analytics) = build_analytics(&config);

    let router = gateway_http::listener::build_router_with_analytics(core.clone(), Some(analytics));
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    tracing::info!(address = %config.bind_address, "mcp-gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    core.close().await.context("closing backends")?;
    collector.destroy().await.ok();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve(serve_args) => serve(serve_args).await,
    }
}
