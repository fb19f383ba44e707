//! Portfolio evaluation
//!
//! Runs the engine over every selected holding and catalog metric. Data is
//! fetched with one task per holding; once every task has finished, the
//! peer-group references are known and the reports are assembled in
//! portfolio order.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::catalog::{MetricCatalog, MetricDefinition};
use crate::config::EngineConfig;
use crate::engine::{compare, compute_deviation, evaluate_alerts, AlertInput, DeviationResult};
use crate::models::{
    Alert, BenchmarkKind, ComparisonRecord, FigureUnit, MetricObservation, MetricSeries,
};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::portfolio::{Holding, Portfolio, SectorFilter};
use crate::source::{HistoricalDataSource, SourceError};

/// How much of a metric's evaluation could be carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    /// Every window and the comparison were computable
    Complete,
    /// A current value exists but some history was missing
    Partial,
    /// No current value; nothing was computed
    NoData,
}

/// Evaluation of one metric for one holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric_id: String,
    pub display_name: String,
    pub status: MetricStatus,
    pub current: Option<f64>,
    pub as_of_date: Option<NaiveDate>,
    /// Observations the deviations were computed over
    pub history_len: usize,
    pub deviations: DeviationResult,
    pub comparison: Option<ComparisonRecord>,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingReport {
    pub holding: Holding,
    /// One entry per catalog metric, in catalog order
    pub metrics: Vec<MetricReport>,
    pub alert_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub holdings: Vec<HoldingReport>,
    /// Every alert, in portfolio, catalog and window order
    pub alerts: Vec<Alert>,
    /// Holding/metric pairs reported as no data
    pub data_unavailable: usize,
    pub metrics_evaluated: usize,
}

/// Raw data gathered for one holding/metric pair
struct FetchedMetric {
    history: MetricSeries,
    current: Option<MetricObservation>,
    error: Option<String>,
}

impl FetchedMetric {
    fn failed(entity_id: &str, metric_id: &str, error: impl Into<String>) -> Self {
        Self {
            history: MetricSeries::empty(entity_id, metric_id),
            current: None,
            error: Some(error.into()),
        }
    }
}

/// Evaluates portfolio holdings against their history and their peers
pub struct PortfolioMonitor {
    source: Arc<dyn HistoricalDataSource>,
    config: Arc<EngineConfig>,
    catalog: Arc<MetricCatalog>,
    portfolio: Arc<Portfolio>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl PortfolioMonitor {
    pub fn builder() -> PortfolioMonitorBuilder {
        PortfolioMonitorBuilder::new()
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Evaluate every holding selected by `filter` as of `as_of`
    pub async fn evaluate(&self, filter: &SectorFilter, as_of: NaiveDate) -> PortfolioReport {
        let start = Instant::now();
        let selected = self.portfolio.select(filter);

        let fetched = self.fetch_all(&selected, as_of).await;
        let peers = peer_references(&selected, &self.catalog, &fetched);

        let mut holdings = Vec::with_capacity(selected.len());
        let mut alerts = Vec::new();
        let mut data_unavailable = 0;

        for (holding, metrics) in selected.iter().zip(fetched) {
            let mut reports = Vec::with_capacity(self.catalog.len());

            for (definition, data) in self.catalog.iter().zip(metrics) {
                let peer = peers
                    .get(&(holding.sector.as_str(), definition.id.as_str()))
                    .copied();
                let report = self.metric_report(holding, definition, data, peer);

                if report.status == MetricStatus::NoData {
                    data_unavailable += 1;
                    self.metrics.inc_data_unavailable();
                    self.logger.log_data_unavailable(
                        &holding.ticker,
                        &definition.id,
                        report.error.as_deref().unwrap_or("no current value"),
                    );
                }
                for alert in &report.alerts {
                    self.metrics.inc_alert(alert);
                    self.logger.log_alert(alert);
                }

                alerts.extend(report.alerts.iter().cloned());
                reports.push(report);
            }

            let alert_count = reports.iter().map(|r| r.alerts.len()).sum();
            holdings.push(HoldingReport {
                holding: (*holding).clone(),
                metrics: reports,
                alert_count,
            });
        }

        let metrics_evaluated = selected.len() * self.catalog.len();
        let elapsed = start.elapsed();

        self.metrics.observe_evaluation_latency(elapsed.as_secs_f64());
        self.metrics.add_holdings_evaluated(selected.len() as u64);
        self.metrics.add_metrics_evaluated(metrics_evaluated as u64);
        self.metrics
            .set_last_evaluation_data_unavailable(data_unavailable as i64);
        self.logger.log_evaluation(
            selected.len(),
            metrics_evaluated,
            alerts.len(),
            data_unavailable,
            elapsed.as_millis(),
        );

        PortfolioReport {
            generated_at: Utc::now(),
            as_of,
            holdings,
            alerts,
            data_unavailable,
            metrics_evaluated,
        }
    }

    /// Evaluate a single holding. Its sector peers are fetched as well, so
    /// the peer-group reference matches a full evaluation.
    pub async fn evaluate_holding(&self, ticker: &str, as_of: NaiveDate) -> Option<HoldingReport> {
        let holding = self.portfolio.get(ticker)?;
        let sector = SectorFilter::new([holding.sector.as_str()]);

        self.evaluate(&sector, as_of)
            .await
            .holdings
            .into_iter()
            .find(|report| report.holding.ticker == holding.ticker)
    }

    /// Fetch history and current values for every selected holding, one
    /// task per holding. The result is indexed like `selected`.
    async fn fetch_all(&self, selected: &[&Holding], as_of: NaiveDate) -> Vec<Vec<FetchedMetric>> {
        let mut tasks = JoinSet::new();

        for (index, holding) in selected.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let config = Arc::clone(&self.config);
            let catalog = Arc::clone(&self.catalog);
            let ticker = holding.ticker.clone();

            tasks.spawn(async move {
                let metrics = fetch_holding(source.as_ref(), &config, &catalog, &ticker, as_of).await;
                (index, metrics)
            });
        }

        let mut slots: Vec<Option<Vec<FetchedMetric>>> = (0..selected.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, metrics)) => slots[index] = Some(metrics),
                Err(e) => warn!(error = %e, "Holding fetch task failed"),
            }
        }

        slots
            .into_iter()
            .zip(selected)
            .map(|(slot, holding)| {
                slot.unwrap_or_else(|| {
                    self.catalog
                        .iter()
                        .map(|m| FetchedMetric::failed(&holding.ticker, &m.id, "fetch task failed"))
                        .collect()
                })
            })
            .collect()
    }

    fn metric_report(
        &self,
        holding: &Holding,
        definition: &MetricDefinition,
        data: FetchedMetric,
        peer_reference: Option<f64>,
    ) -> MetricReport {
        let config = &self.config;

        let Some(current) = data.current else {
            return MetricReport {
                metric_id: definition.id.clone(),
                display_name: definition.display_name.clone(),
                status: MetricStatus::NoData,
                current: None,
                as_of_date: None,
                history_len: 0,
                deviations: DeviationResult::default(),
                comparison: None,
                alerts: Vec::new(),
                error: Some(data.error.unwrap_or_else(|| {
                    format!("no value within {} days", config.current_value_days)
                })),
            };
        };

        // The current observation is never part of its own baseline
        let history = data.history.before(current.date);
        let deviations = compute_deviation(&history, current.value, &config.windows);

        let mut alerts = Vec::new();
        for entry in deviations.iter() {
            alerts.extend(evaluate_alerts(
                &AlertInput {
                    entity_id: &holding.ticker,
                    metric_id: &definition.id,
                    current_value: current.value,
                    figure: Some(entry.deviation),
                    benchmark_value: entry.mean,
                    benchmark_kind: BenchmarkKind::Historical,
                    unit: FigureUnit::Sigma,
                    window: Some(&entry.window),
                },
                &config.deviation_thresholds,
            ));
        }

        let comparison = deviations
            .window(&config.reference_window)
            .map(|reference| {
                compare(
                    &holding.ticker,
                    &definition.id,
                    current.value,
                    reference.mean,
                    peer_reference.unwrap_or(current.value),
                )
            });

        if let Some(record) = &comparison {
            alerts.extend(evaluate_alerts(
                &AlertInput {
                    entity_id: &holding.ticker,
                    metric_id: &definition.id,
                    current_value: current.value,
                    figure: Some(record.percent_change),
                    benchmark_value: record.historical_reference,
                    benchmark_kind: BenchmarkKind::Historical,
                    unit: FigureUnit::Percent,
                    window: None,
                },
                &config.percent_thresholds,
            ));

            if config.peer_alerts {
                alerts.extend(evaluate_alerts(
                    &AlertInput {
                        entity_id: &holding.ticker,
                        metric_id: &definition.id,
                        current_value: current.value,
                        figure: Some(record.peer_percent_change),
                        benchmark_value: record.peer_reference,
                        benchmark_kind: BenchmarkKind::PeerGroup,
                        unit: FigureUnit::Percent,
                        window: None,
                    },
                    &config.percent_thresholds,
                ));
            }
        }

        let status = if comparison.is_some() && deviations.len() == config.windows.len() {
            MetricStatus::Complete
        } else {
            MetricStatus::Partial
        };

        MetricReport {
            metric_id: definition.id.clone(),
            display_name: definition.display_name.clone(),
            status,
            current: Some(current.value),
            as_of_date: Some(current.date),
            history_len: history.len(),
            deviations,
            comparison,
            alerts,
            error: data.error,
        }
    }
}

/// Fetch every catalog metric for one holding. Failures are recorded on
/// the returned entry, never propagated.
async fn fetch_holding(
    source: &dyn HistoricalDataSource,
    config: &EngineConfig,
    catalog: &MetricCatalog,
    ticker: &str,
    as_of: NaiveDate,
) -> Vec<FetchedMetric> {
    let start = as_of
        .checked_sub_months(Months::new(config.lookback_years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN);

    let mut fetched = Vec::with_capacity(catalog.len());
    for metric in catalog.iter() {
        let (history, current) = tokio::join!(
            source.fetch(ticker, &metric.id, start, as_of, config.frequency),
            source.latest(ticker, &metric.id, as_of, config.current_value_days),
        );

        let mut error: Option<SourceError> = None;
        let history = history.unwrap_or_else(|e| {
            error = Some(e);
            MetricSeries::empty(ticker, &metric.id)
        });
        let current = match current {
            Ok(current) => current,
            Err(e) => {
                error.get_or_insert(e);
                None
            }
        };

        if let Some(e) = &error {
            debug!(
                source = source.name(),
                ticker,
                metric_id = %metric.id,
                error = %e,
                "Data source request failed"
            );
        }

        fetched.push(FetchedMetric {
            history,
            current,
            error: error.map(|e| e.to_string()),
        });
    }
    fetched
}

/// Mean current value per (sector, metric) across the selected holdings
fn peer_references<'a>(
    selected: &[&'a Holding],
    catalog: &'a MetricCatalog,
    fetched: &[Vec<FetchedMetric>],
) -> HashMap<(&'a str, &'a str), f64> {
    let mut sums: HashMap<(&str, &str), (f64, usize)> = HashMap::new();

    for (holding, metrics) in selected.iter().zip(fetched) {
        for (definition, data) in catalog.iter().zip(metrics) {
            if let Some(current) = &data.current {
                let entry = sums
                    .entry((holding.sector.as_str(), definition.id.as_str()))
                    .or_insert((0.0, 0));
                entry.0 += current.value;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Builder for [`PortfolioMonitor`]
pub struct PortfolioMonitorBuilder {
    source: Option<Arc<dyn HistoricalDataSource>>,
    config: EngineConfig,
    catalog: MetricCatalog,
    portfolio: Portfolio,
    node_name: String,
}

impl PortfolioMonitorBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            config: EngineConfig::default(),
            catalog: MetricCatalog::default(),
            portfolio: Portfolio::default(),
            node_name: "unknown".to_string(),
        }
    }

    pub fn source(mut self, source: Arc<dyn HistoricalDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: MetricCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn portfolio(mut self, portfolio: Portfolio) -> Self {
        self.portfolio = portfolio;
        self
    }

    /// Node name attached to structured log events
    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    /// Validate the configuration and build the monitor
    pub fn build(self) -> Result<PortfolioMonitor> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Data source is required"))?;
        self.config.validate()?;

        let metrics = MonitorMetrics::new();
        metrics.set_portfolio_holdings(self.portfolio.len() as i64);

        Ok(PortfolioMonitor {
            source,
            config: Arc::new(self.config),
            catalog: Arc::new(self.catalog),
            portfolio: Arc::new(self.portfolio),
            metrics,
            logger: StructuredLogger::new(self.node_name),
        })
    }
}

impl Default for PortfolioMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
