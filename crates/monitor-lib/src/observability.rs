//! Observability infrastructure for the portfolio monitor
//!
//! Provides:
//! - Prometheus metrics (evaluation latency, alert counts, data gaps)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{Alert, BenchmarkKind};

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    evaluation_latency_seconds: Histogram,
    holdings_evaluated: IntCounter,
    metrics_evaluated: IntCounter,
    alerts_raised: IntCounterVec,
    data_unavailable: IntCounter,
    last_evaluation_data_unavailable: IntGauge,
    portfolio_holdings: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "portfolio_monitor_evaluation_latency_seconds",
                "Time spent evaluating a portfolio selection",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            holdings_evaluated: register_int_counter!(
                "portfolio_monitor_holdings_evaluated_total",
                "Total number of holdings evaluated"
            )
            .expect("Failed to register holdings_evaluated"),

            metrics_evaluated: register_int_counter!(
                "portfolio_monitor_metrics_evaluated_total",
                "Total number of holding/metric pairs evaluated"
            )
            .expect("Failed to register metrics_evaluated"),

            alerts_raised: register_int_counter_vec!(
                "portfolio_monitor_alerts_raised_total",
                "Total number of alerts raised",
                &["benchmark_kind", "severity"]
            )
            .expect("Failed to register alerts_raised"),

            data_unavailable: register_int_counter!(
                "portfolio_monitor_data_unavailable_total",
                "Total number of holding/metric pairs with no data"
            )
            .expect("Failed to register data_unavailable"),

            last_evaluation_data_unavailable: register_int_gauge!(
                "portfolio_monitor_last_evaluation_data_unavailable",
                "Holding/metric pairs with no data in the most recent evaluation"
            )
            .expect("Failed to register last_evaluation_data_unavailable"),

            portfolio_holdings: register_int_gauge!(
                "portfolio_monitor_portfolio_holdings",
                "Number of holdings in the configured portfolio"
            )
            .expect("Failed to register portfolio_holdings"),
        }
    }
}

/// Handle to the global monitor metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a handle, registering the metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    pub fn add_holdings_evaluated(&self, count: u64) {
        self.inner().holdings_evaluated.inc_by(count);
    }

    pub fn add_metrics_evaluated(&self, count: u64) {
        self.inner().metrics_evaluated.inc_by(count);
    }

    pub fn inc_alert(&self, alert: &Alert) {
        let kind = match alert.benchmark_kind {
            BenchmarkKind::Historical => "historical",
            BenchmarkKind::PeerGroup => "peer_group",
        };
        self.inner()
            .alerts_raised
            .with_label_values(&[kind, alert.severity.as_str()])
            .inc();
    }

    pub fn inc_data_unavailable(&self) {
        self.inner().data_unavailable.inc();
    }

    pub fn set_last_evaluation_data_unavailable(&self, count: i64) {
        self.inner().last_evaluation_data_unavailable.set(count);
    }

    pub fn set_portfolio_holdings(&self, count: i64) {
        self.inner().portfolio_holdings.set(count);
    }
}

/// Structured logger for monitor events
///
/// Emits one event per significant occurrence with consistent fields, so
/// the JSON log stream can be filtered by `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, source: &str, holdings: usize, metrics: usize) {
        info!(
            event = "monitor_started",
            node = %self.node_name,
            monitor_version = %version,
            source = %source,
            holdings = holdings,
            metrics = metrics,
            "Portfolio monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Portfolio monitor shutting down"
        );
    }

    pub fn log_evaluation(
        &self,
        holdings: usize,
        metrics_evaluated: usize,
        alerts: usize,
        data_unavailable: usize,
        duration_ms: u128,
    ) {
        info!(
            event = "evaluation_completed",
            node = %self.node_name,
            holdings = holdings,
            metrics_evaluated = metrics_evaluated,
            alerts = alerts,
            data_unavailable = data_unavailable,
            duration_ms = duration_ms as u64,
            "Portfolio evaluation completed"
        );
    }

    /// Log a raised alert; the most severe tier logs at warn level
    pub fn log_alert(&self, alert: &Alert) {
        if alert.highest_tier {
            warn!(
                event = "alert_raised",
                node = %self.node_name,
                entity_id = %alert.entity_id,
                metric_id = %alert.metric_id,
                benchmark_kind = %alert.benchmark_kind,
                severity = %alert.severity,
                figure = alert.figure,
                unit = %alert.unit,
                window = ?alert.window,
                "{}",
                alert.message
            );
        } else {
            info!(
                event = "alert_raised",
                node = %self.node_name,
                entity_id = %alert.entity_id,
                metric_id = %alert.metric_id,
                benchmark_kind = %alert.benchmark_kind,
                severity = %alert.severity,
                figure = alert.figure,
                unit = %alert.unit,
                window = ?alert.window,
                "{}",
                alert.message
            );
        }
    }

    pub fn log_data_unavailable(&self, entity_id: &str, metric_id: &str, reason: &str) {
        warn!(
            event = "data_unavailable",
            node = %self.node_name,
            entity_id = %entity_id,
            metric_id = %metric_id,
            reason = %reason,
            "No data available for metric"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FigureUnit;

    #[test]
    fn test_monitor_metrics_creation() {
        // Registration happens once per process; repeated handles share it
        let metrics = MonitorMetrics::new();
        let again = MonitorMetrics::new();

        metrics.observe_evaluation_latency(0.05);
        metrics.add_holdings_evaluated(5);
        metrics.add_metrics_evaluated(80);
        metrics.inc_data_unavailable();
        again.set_last_evaluation_data_unavailable(1);
        again.set_portfolio_holdings(5);
    }

    #[test]
    fn test_alert_counter_labels() {
        let metrics = MonitorMetrics::new();
        let alert = Alert {
            entity_id: "MSFT".to_string(),
            metric_id: "pe_ratio".to_string(),
            current_value: 40.0,
            benchmark_value: 30.0,
            benchmark_kind: BenchmarkKind::PeerGroup,
            figure: 33.3,
            unit: FigureUnit::Percent,
            severity: "high".to_string(),
            highest_tier: true,
            window: None,
            message: "test".to_string(),
        };

        let before = GLOBAL_METRICS
            .get()
            .unwrap()
            .alerts_raised
            .with_label_values(&["peer_group", "high"])
            .get();
        metrics.inc_alert(&alert);
        let after = GLOBAL_METRICS
            .get()
            .unwrap()
            .alerts_raised
            .with_label_values(&["peer_group", "high"])
            .get();

        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
