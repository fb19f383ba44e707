//! Evaluation, holding detail and alert commands

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use monitor_lib::{Alert, FigureUnit, MetricDefinition, MetricReport, MetricStatus, ValueFormat};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_change, color_severity, color_status, format_figure, format_value, print_info,
    print_json, print_success, print_table, print_warning, AlertKind, OutputFormat,
};

#[derive(Tabled)]
struct EvaluationRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Hist Avg")]
    historical: String,
    #[tabled(rename = "vs Hist")]
    change: String,
    #[tabled(rename = "Peer Avg")]
    peer: String,
    #[tabled(rename = "vs Peer")]
    peer_change: String,
    #[tabled(rename = "Max Dev")]
    max_deviation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Alerts")]
    alerts: usize,
}

#[derive(Tabled)]
struct HoldingMetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "As Of")]
    as_of: String,
    #[tabled(rename = "Hist Avg")]
    historical: String,
    #[tabled(rename = "vs Hist")]
    change: String,
    #[tabled(rename = "Peer Avg")]
    peer: String,
    #[tabled(rename = "vs Peer")]
    peer_change: String,
    #[tabled(rename = "Deviations")]
    deviations: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Benchmark")]
    benchmark: String,
    #[tabled(rename = "Figure")]
    figure: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Client-side alert selection
#[derive(Debug, Default)]
pub struct AlertFilter {
    pub severity: Option<String>,
    pub kind: Option<AlertKind>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        let severity_ok = self
            .severity
            .as_deref()
            .map_or(true, |s| alert.severity.eq_ignore_ascii_case(s));
        let kind_ok = self.kind.map_or(true, |k| k.matches(alert.benchmark_kind));
        severity_ok && kind_ok
    }
}

fn value_formats(catalog: Vec<MetricDefinition>) -> HashMap<String, ValueFormat> {
    catalog.into_iter().map(|m| (m.id, m.format)).collect()
}

/// Largest-magnitude deviation with its window, e.g. `+7.50σ (5 Years)`
fn max_deviation(report: &MetricReport) -> String {
    report
        .deviations
        .iter()
        .max_by(|a, b| a.deviation.abs().total_cmp(&b.deviation.abs()))
        .map(|d| format!("{} ({})", format_figure(d.deviation, FigureUnit::Sigma), d.window))
        .unwrap_or_else(|| "-".to_string())
}

fn comparison_columns(report: &MetricReport, format: ValueFormat) -> [String; 4] {
    match &report.comparison {
        Some(c) => [
            format.render(c.historical_reference),
            color_change(c.percent_change),
            format.render(c.peer_reference),
            color_change(c.peer_percent_change),
        ],
        None => std::array::from_fn(|_| "-".to_string()),
    }
}

fn alert_rows<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Vec<AlertRow> {
    alerts
        .into_iter()
        .map(|a| AlertRow {
            ticker: a.entity_id.clone(),
            metric: a.metric_id.clone(),
            severity: color_severity(&a.severity, a.highest_tier),
            benchmark: match &a.window {
                Some(window) => format!("{} ({})", a.benchmark_kind, window),
                None => a.benchmark_kind.to_string(),
            },
            figure: format_figure(a.figure, a.unit),
            message: a.message.clone(),
        })
        .collect()
}

pub async fn show_evaluation(
    client: &ApiClient,
    sector: Option<&str>,
    as_of: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.evaluate(sector, as_of).await?;

    if let OutputFormat::Json = format {
        return print_json(&report);
    }

    let formats = value_formats(client.catalog().await?);
    let mut rows = Vec::new();
    for holding in &report.holdings {
        for metric in &holding.metrics {
            let value_format = formats.get(&metric.metric_id).copied().unwrap_or_default();
            let [historical, change, peer, peer_change] = comparison_columns(metric, value_format);
            rows.push(EvaluationRow {
                ticker: holding.holding.ticker.clone(),
                metric: metric.display_name.clone(),
                current: format_value(metric.current, value_format),
                historical,
                change,
                peer,
                peer_change,
                max_deviation: max_deviation(metric),
                status: color_status(metric.status),
                alerts: metric.alerts.len(),
            });
        }
    }

    print_info(&format!(
        "Evaluation as of {} ({} holdings)",
        report.as_of,
        report.holdings.len()
    ));
    print_table(rows, "No holdings match the sector filter");

    if report.data_unavailable > 0 {
        print_warning(&format!(
            "No data for {} of {} metrics",
            report.data_unavailable, report.metrics_evaluated
        ));
    }
    if report.alerts.is_empty() {
        print_success("No alerts raised");
    } else {
        println!("\n{}", format!("{} alerts raised", report.alerts.len()).bold());
    }

    Ok(())
}

pub async fn show_holding(
    client: &ApiClient,
    ticker: &str,
    as_of: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.holding(ticker, as_of).await?;

    if let OutputFormat::Json = format {
        return print_json(&report);
    }

    let formats = value_formats(client.catalog().await?);
    let holding = &report.holding;

    println!("{}", format!("{} ({})", holding.name, holding.ticker).bold());
    println!("Sector:   {}", holding.sector.cyan());
    if !holding.industry.is_empty() {
        println!("Industry: {}", holding.industry.cyan());
    }
    println!();

    let rows = report
        .metrics
        .iter()
        .map(|metric| {
            let value_format = formats.get(&metric.metric_id).copied().unwrap_or_default();
            let [historical, change, peer, peer_change] = comparison_columns(metric, value_format);
            let deviations = metric
                .deviations
                .iter()
                .map(|d| format!("{}: {}", d.window, format_figure(d.deviation, FigureUnit::Sigma)))
                .collect::<Vec<_>>()
                .join("\n");

            HoldingMetricRow {
                metric: metric.display_name.clone(),
                current: format_value(metric.current, value_format),
                as_of: metric
                    .as_of_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                historical,
                change,
                peer,
                peer_change,
                deviations: if deviations.is_empty() {
                    "-".to_string()
                } else {
                    deviations
                },
                status: color_status(metric.status),
            }
        })
        .collect();
    print_table::<HoldingMetricRow>(rows, "No metrics evaluated");

    let alerts: Vec<&Alert> = report.metrics.iter().flat_map(|m| &m.alerts).collect();
    if alerts.is_empty() {
        print_success("No alerts raised");
    } else {
        println!("\n{}", "Alerts".bold());
        print_table(alert_rows(alerts), "No alerts raised");
    }

    let unavailable = report
        .metrics
        .iter()
        .filter(|m| m.status == MetricStatus::NoData)
        .count();
    if unavailable > 0 {
        print_warning(&format!(
            "No data for {} of {} metrics",
            unavailable,
            report.metrics.len()
        ));
    }

    Ok(())
}

pub async fn show_alerts(
    client: &ApiClient,
    sector: Option<&str>,
    as_of: Option<NaiveDate>,
    filter: &AlertFilter,
    format: OutputFormat,
) -> Result<()> {
    let report = client.evaluate(sector, as_of).await?;
    let alerts: Vec<&Alert> = report.alerts.iter().filter(|a| filter.matches(a)).collect();

    match format {
        OutputFormat::Json => print_json(&alerts)?,
        OutputFormat::Table => {
            let total = alerts.len();
            print_table(alert_rows(alerts), "No alerts match the filter");
            if total > 0 {
                println!("\nTotal: {} alerts", total);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_lib::BenchmarkKind;

    fn alert(severity: &str, kind: BenchmarkKind) -> Alert {
        Alert {
            entity_id: "MSFT".to_string(),
            metric_id: "pe_ratio".to_string(),
            current_value: 40.0,
            benchmark_value: 30.0,
            benchmark_kind: kind,
            figure: 33.3,
            unit: FigureUnit::Percent,
            severity: severity.to_string(),
            highest_tier: severity == "high",
            window: None,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = AlertFilter::default();
        assert!(filter.matches(&alert("medium", BenchmarkKind::Historical)));
        assert!(filter.matches(&alert("high", BenchmarkKind::PeerGroup)));
    }

    #[test]
    fn test_filter_by_severity_and_kind() {
        let filter = AlertFilter {
            severity: Some("HIGH".to_string()),
            kind: Some(AlertKind::Peer),
        };

        assert!(filter.matches(&alert("high", BenchmarkKind::PeerGroup)));
        assert!(!filter.matches(&alert("high", BenchmarkKind::Historical)));
        assert!(!filter.matches(&alert("medium", BenchmarkKind::PeerGroup)));
    }

    #[test]
    fn test_alert_rows_label_window() {
        let mut deviation = alert("significant", BenchmarkKind::Historical);
        deviation.window = Some("5 Years".to_string());
        deviation.unit = FigureUnit::Sigma;
        deviation.figure = 7.5;

        let rows = alert_rows([&deviation]);
        assert_eq!(rows[0].benchmark, "Historical (5 Years)");
        assert_eq!(rows[0].figure, "+7.50σ");
    }
}
