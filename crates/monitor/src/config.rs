//! Service configuration
//!
//! Read from an optional TOML file, then overridden by `PMON_`-prefixed
//! environment variables, with `__` separating nested keys
//! (e.g. `PMON_ENGINE__PEER_ALERTS=true`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use monitor_lib::source::{HttpDataSource, HttpSourceConfig, StaticDataSource};
use monitor_lib::{ConfigError, EngineConfig, HistoricalDataSource, MetricCatalog, Portfolio};
use serde::Deserialize;

/// Monitor service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Name attached to log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub portfolio: Portfolio,

    /// Metric catalog
    #[serde(default)]
    pub metrics: MetricCatalog,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Http,
    #[default]
    Fixture,
}

/// Where historical data comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// JSON fixture served when `kind = "fixture"`
    pub fixture_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Fixture,
            base_url: HttpSourceConfig::default().base_url,
            api_key: None,
            timeout_secs: 30,
            fixture_path: PathBuf::from("fixtures/demo_portfolio.json"),
        }
    }
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

impl MonitorConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix("PMON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder
            .build()
            .context("Failed to read monitor configuration")?
            .try_deserialize()
            .context("Invalid monitor configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "source.timeout_secs",
            });
        }
        Ok(())
    }

    /// Construct the configured data source
    pub async fn build_source(&self) -> Result<Arc<dyn HistoricalDataSource>> {
        let source: Arc<dyn HistoricalDataSource> = match self.source.kind {
            SourceKind::Http => {
                let http = HttpDataSource::new(&HttpSourceConfig {
                    base_url: self.source.base_url.clone(),
                    api_key: self.source.api_key.clone(),
                    timeout: Duration::from_secs(self.source.timeout_secs),
                })
                .context("Failed to create HTTP data source")?;
                Arc::new(http)
            }
            SourceKind::Fixture => {
                let fixture = StaticDataSource::load(&self.source.fixture_path)
                    .await
                    .context("Failed to load fixture data source")?;
                Arc::new(fixture)
            }
        };
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = MonitorConfig::load(None).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert_eq!(config.portfolio.len(), 5);
        assert_eq!(config.metrics.len(), 16);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
api_port = 9090

[engine]
reference_window = "3 Years"
peer_alerts = true

[[engine.percent_thresholds]]
name = "low"
magnitude = 2

[[engine.percent_thresholds]]
name = "high"
magnitude = 8.5

[source]
kind = "http"
base_url = "http://localhost:9999"
timeout_secs = 5

[[portfolio]]
ticker = "NVDA"
name = "Nvidia"
sector = "Technology"
industry = "Semiconductors"
"#,
        );

        let config = MonitorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.api_port, 9090);
        assert_eq!(config.engine.reference_window, "3 Years");
        assert!(config.engine.peer_alerts);
        let tiers: Vec<f64> = config
            .engine
            .percent_thresholds
            .iter()
            .map(|t| t.magnitude)
            .collect();
        assert_eq!(tiers, vec![2.0, 8.5]);
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.timeout_secs, 5);
        assert_eq!(config.portfolio.len(), 1);
        assert!(config.portfolio.get("nvda").is_some());
    }

    #[test]
    fn test_descending_thresholds_rejected() {
        let file = write_config(
            r#"
[[engine.deviation_thresholds]]
name = "major"
magnitude = 5.0

[[engine.deviation_thresholds]]
name = "minor"
magnitude = 3.0
"#,
        );

        assert!(MonitorConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_unknown_reference_window_rejected() {
        let file = write_config(
            r#"
[engine]
reference_window = "Last Decade"
"#,
        );

        assert!(MonitorConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(MonitorConfig::load(Some(Path::new("/nonexistent/pmon.toml"))).is_err());
    }

    #[tokio::test]
    async fn test_build_fixture_source() {
        let fixture = write_config(
            r#"{"series": [{"entity_id": "MSFT", "metric_id": "pe_ratio",
                "observations": [{"date": "2024-09-30", "value": 34.1}]}]}"#,
        );
        let config = MonitorConfig {
            source: SourceConfig {
                fixture_path: fixture.path().to_path_buf(),
                ..SourceConfig::default()
            },
            ..MonitorConfig::load(None).unwrap()
        };

        let source = config.build_source().await.unwrap();
        assert_eq!(source.name(), "fixture");
    }

    #[tokio::test]
    async fn test_demo_fixture_covers_default_catalog() {
        let defaults = MonitorConfig::load(None).unwrap();
        let config = MonitorConfig {
            source: SourceConfig {
                fixture_path: Path::new(env!("CARGO_MANIFEST_DIR"))
                    .join("../..")
                    .join(&defaults.source.fixture_path),
                ..defaults.source.clone()
            },
            ..defaults
        };

        let monitor = monitor_lib::PortfolioMonitor::builder()
            .source(config.build_source().await.unwrap())
            .config(config.engine.clone())
            .catalog(config.metrics.clone())
            .portfolio(config.portfolio.clone())
            .build()
            .unwrap();
        let as_of = chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let report = monitor
            .evaluate(&monitor_lib::SectorFilter::all(), as_of)
            .await;

        assert_eq!(report.metrics_evaluated, 80);
        assert_eq!(report.data_unavailable, 0);
        // Only the shocked series alert: MSFT and AMZN PE, JPM dividend yield, AAPL net margin
        assert_eq!(report.alerts.len(), 13);
        let mut alerted: Vec<(&str, &str)> = report
            .alerts
            .iter()
            .map(|a| (a.entity_id.as_str(), a.metric_id.as_str()))
            .collect();
        alerted.dedup();
        assert_eq!(
            alerted,
            vec![
                ("MSFT", "pe_ratio"),
                ("AAPL", "net_margin"),
                ("AMZN", "pe_ratio"),
                ("JPM", "dividend_yield"),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_http_source_rejects_bad_url() {
        let config = MonitorConfig {
            source: SourceConfig {
                kind: SourceKind::Http,
                base_url: "not a url".to_string(),
                ..SourceConfig::default()
            },
            ..MonitorConfig::load(None).unwrap()
        };

        assert!(config.build_source().await.is_err());
    }
}
