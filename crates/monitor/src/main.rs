//! Portfolio Monitor - fundamentals deviation and alerting service
//!
//! Serves portfolio evaluations over HTTP, together with health probes and
//! Prometheus metrics.

use anyhow::{Context, Result};
use monitor_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    PortfolioMonitor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting portfolio-monitor");

    let config_path = std::env::var_os("PMON_CONFIG").map(PathBuf::from);
    let config = config::MonitorConfig::load(config_path.as_deref())?;
    info!(
        node_name = %config.node_name,
        source = ?config.source.kind,
        holdings = config.portfolio.len(),
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATA_SOURCE).await;
    health_registry.register(components::ENGINE).await;

    let source = config.build_source().await?;
    let monitor = PortfolioMonitor::builder()
        .source(source)
        .config(config.engine.clone())
        .catalog(config.metrics.clone())
        .portfolio(config.portfolio.clone())
        .node_name(&config.node_name)
        .build()
        .context("Failed to build portfolio monitor")?;

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(
        MONITOR_VERSION,
        monitor.source_name(),
        monitor.portfolio().len(),
        monitor.catalog().len(),
    );

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        Arc::new(monitor),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    logger.log_shutdown("API server task panicked");
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
