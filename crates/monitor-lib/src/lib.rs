//! Portfolio fundamentals monitoring library
//!
//! This crate provides the core functionality for:
//! - Windowed statistics and standardized deviation of metric series
//! - Current vs. historical vs. peer-group comparison records
//! - Threshold-driven alert classification
//! - Market-data source adapters
//! - Portfolio evaluation, health checks and observability

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod portfolio;
pub mod source;

pub use catalog::{MetricCatalog, MetricDefinition, ValueFormat};
pub use config::EngineConfig;
pub use error::ConfigError;
pub use health::{
    ComponentHealth, ComponentStatus, EvaluationSummary, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use monitor::{
    HoldingReport, MetricReport, MetricStatus, PortfolioMonitor, PortfolioMonitorBuilder,
    PortfolioReport,
};
pub use observability::{MonitorMetrics, StructuredLogger};
pub use portfolio::{Holding, Portfolio, SectorFilter};
pub use source::{Frequency, HistoricalDataSource, SourceError};
