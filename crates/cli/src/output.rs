//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use monitor_lib::{BenchmarkKind, FigureUnit, MetricStatus, ValueFormat};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Benchmark an alert was raised against
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlertKind {
    Historical,
    Peer,
}

impl AlertKind {
    pub fn matches(&self, kind: BenchmarkKind) -> bool {
        matches!(
            (self, kind),
            (AlertKind::Historical, BenchmarkKind::Historical)
                | (AlertKind::Peer, BenchmarkKind::PeerGroup)
        )
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a warning when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Render an optional metric value, `-` when absent
pub fn format_value(value: Option<f64>, format: ValueFormat) -> String {
    value
        .map(|v| format.render(v))
        .unwrap_or_else(|| "-".to_string())
}

/// Render a figure with its unit, e.g. `+7.50σ` or `-12.3%`
pub fn format_figure(figure: f64, unit: FigureUnit) -> String {
    match unit {
        FigureUnit::Sigma => format!("{:+.2}σ", figure),
        FigureUnit::Percent => format!("{:+.1}%", figure),
    }
}

/// Signed percent change, green when up and red when down
pub fn color_change(change: f64) -> String {
    let formatted = format_figure(change, FigureUnit::Percent);
    if change > 0.0 {
        formatted.green().to_string()
    } else if change < 0.0 {
        formatted.red().to_string()
    } else {
        formatted
    }
}

pub fn color_severity(severity: &str, highest_tier: bool) -> String {
    if highest_tier {
        severity.red().bold().to_string()
    } else {
        severity.yellow().to_string()
    }
}

pub fn color_status(status: MetricStatus) -> String {
    match status {
        MetricStatus::Complete => "complete".green().to_string(),
        MetricStatus::Partial => "partial".yellow().to_string(),
        MetricStatus::NoData => "no data".dimmed().to_string(),
    }
}
