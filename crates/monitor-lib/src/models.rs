//! Core data models for the monitor

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point in a metric's time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub date: NaiveDate,
    pub value: f64,
}

impl MetricObservation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Observations of one metric for one entity, sorted ascending by date.
///
/// Construction drops non-finite values and resolves duplicate dates
/// last-wins: of two observations sharing a date, the one that came later
/// in the input is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SeriesRecord")]
pub struct MetricSeries {
    pub entity_id: String,
    pub metric_id: String,
    observations: Vec<MetricObservation>,
}

#[derive(Deserialize)]
struct SeriesRecord {
    entity_id: String,
    metric_id: String,
    #[serde(default)]
    observations: Vec<MetricObservation>,
}

impl From<SeriesRecord> for MetricSeries {
    fn from(record: SeriesRecord) -> Self {
        Self::new(record.entity_id, record.metric_id, record.observations)
    }
}

impl MetricSeries {
    pub fn new(
        entity_id: impl Into<String>,
        metric_id: impl Into<String>,
        mut observations: Vec<MetricObservation>,
    ) -> Self {
        observations.retain(|o| o.value.is_finite());
        // Stable sort keeps input order among equal dates
        observations.sort_by_key(|o| o.date);

        let mut deduped: Vec<MetricObservation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => deduped.push(obs),
            }
        }

        Self {
            entity_id: entity_id.into(),
            metric_id: metric_id.into(),
            observations: deduped,
        }
    }

    /// Series with no observations
    pub fn empty(entity_id: impl Into<String>, metric_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            metric_id: metric_id.into(),
            observations: Vec::new(),
        }
    }

    pub fn observations(&self) -> &[MetricObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Most recent observation
    pub fn latest(&self) -> Option<&MetricObservation> {
        self.observations.last()
    }

    /// The trailing `k` observations, or `None` when fewer are available
    pub fn tail(&self, k: usize) -> Option<&[MetricObservation]> {
        let n = self.observations.len();
        if k > n {
            return None;
        }
        Some(&self.observations[n - k..])
    }

    /// Observations dated within `[start, end]`
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            entity_id: self.entity_id.clone(),
            metric_id: self.metric_id.clone(),
            observations: self
                .observations
                .iter()
                .filter(|o| o.date >= start && o.date <= end)
                .copied()
                .collect(),
        }
    }

    /// Observations dated strictly before `date`
    pub fn before(&self, date: NaiveDate) -> Self {
        Self {
            entity_id: self.entity_id.clone(),
            metric_id: self.metric_id.clone(),
            observations: self
                .observations
                .iter()
                .take_while(|o| o.date < date)
                .copied()
                .collect(),
        }
    }
}

/// What a figure was measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    Historical,
    PeerGroup,
}

impl std::fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchmarkKind::Historical => write!(f, "Historical"),
            BenchmarkKind::PeerGroup => write!(f, "Peer Group"),
        }
    }
}

/// Unit of an alert figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureUnit {
    /// Standard deviations from a window mean
    Sigma,
    /// Percent change from a reference value
    Percent,
}

impl std::fmt::Display for FigureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FigureUnit::Sigma => write!(f, "σ"),
            FigureUnit::Percent => write!(f, "%"),
        }
    }
}

/// Current value against historical and peer-group references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub entity_id: String,
    pub metric_id: String,
    pub current: f64,
    pub historical_reference: f64,
    pub peer_reference: f64,
    /// Percent change of `current` vs `historical_reference`
    pub percent_change: f64,
    /// Percent change of `current` vs `peer_reference`
    pub peer_percent_change: f64,
}

/// A classified threshold breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub entity_id: String,
    pub metric_id: String,
    pub current_value: f64,
    pub benchmark_value: f64,
    pub benchmark_kind: BenchmarkKind,
    /// Signed deviation (sigma) or percent change
    pub figure: f64,
    pub unit: FigureUnit,
    /// Name of the severity tier the figure landed in
    pub severity: String,
    /// True when the tier is the most severe one configured
    pub highest_tier: bool,
    /// Lookback window the figure was computed over, for deviation alerts
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub window: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_series_sorted_on_construction() {
        let series = MetricSeries::new(
            "MSFT",
            "pe_ratio",
            vec![
                MetricObservation::new(date(2024, 6, 30), 2.0),
                MetricObservation::new(date(2024, 3, 31), 1.0),
                MetricObservation::new(date(2024, 9, 30), 3.0),
            ],
        );

        let values: Vec<f64> = series.observations().iter().map(|o| o.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_duplicate_dates_last_wins() {
        let series = MetricSeries::new(
            "MSFT",
            "pe_ratio",
            vec![
                MetricObservation::new(date(2024, 3, 31), 1.0),
                MetricObservation::new(date(2024, 6, 30), 2.0),
                MetricObservation::new(date(2024, 3, 31), 9.0),
            ],
        );

        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[0].value, 9.0);
    }

    #[test]
    fn test_non_finite_values_dropped() {
        let series = MetricSeries::new(
            "MSFT",
            "pe_ratio",
            vec![
                MetricObservation::new(date(2024, 3, 31), f64::NAN),
                MetricObservation::new(date(2024, 6, 30), 2.0),
            ],
        );

        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_before_excludes_date() {
        let series = MetricSeries::new(
            "JNJ",
            "dividend_yield",
            vec![
                MetricObservation::new(date(2024, 9, 30), 0.03),
                MetricObservation::new(date(2024, 12, 20), 0.031),
            ],
        );

        let history = series.before(date(2024, 12, 20));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().date, date(2024, 9, 30));
    }

    #[test]
    fn test_tail() {
        let series = MetricSeries::new(
            "MSFT",
            "pe_ratio",
            (1..=5)
                .map(|m| MetricObservation::new(date(2024, m, 1), m as f64))
                .collect(),
        );

        let tail = series.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].value, 4.0);
        assert!(series.tail(6).is_none());
        assert_eq!(series.tail(0).unwrap().len(), 0);
    }

    #[test]
    fn test_deserialize_restores_ordering() {
        let json = r#"{
            "entity_id": "AAPL",
            "metric_id": "net_margin",
            "observations": [
                {"date": "2024-06-30", "value": 0.25},
                {"date": "2024-03-31", "value": 0.24}
            ]
        }"#;

        let series: MetricSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.observations()[0].date, date(2024, 3, 31));
    }
}
