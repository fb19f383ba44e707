//! In-memory data source
//!
//! Serves series loaded from a JSON fixture or inserted programmatically.
//! Stored series keep whatever granularity they were recorded at; the
//! requested frequency is ignored and only the date range filters.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{async_trait, Frequency, HistoricalDataSource, SourceError};
use crate::models::MetricSeries;

#[derive(Deserialize)]
struct FixtureFile {
    series: Vec<MetricSeries>,
}

/// Data source backed by series held in memory
#[derive(Debug, Default, Clone)]
pub struct StaticDataSource {
    series: HashMap<(String, String), MetricSeries>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the series for its entity/metric pair
    pub fn insert(&mut self, series: MetricSeries) {
        let key = (series.entity_id.clone(), series.metric_id.clone());
        self.series.insert(key, series);
    }

    pub fn with_series(mut self, series: MetricSeries) -> Self {
        self.insert(series);
        self
    }

    /// Parse a fixture document: `{"series": [{entity_id, metric_id, observations}]}`
    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let fixture: FixtureFile =
            serde_json::from_str(json).map_err(|e| SourceError::Fixture(e.to_string()))?;

        let mut source = Self::new();
        for series in fixture.series {
            source.insert(series);
        }
        Ok(source)
    }

    /// Load a fixture document from disk
    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[async_trait]
impl HistoricalDataSource for StaticDataSource {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch(
        &self,
        entity_id: &str,
        metric_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        _frequency: Frequency,
    ) -> Result<MetricSeries, SourceError> {
        self.series
            .get(&(entity_id.to_string(), metric_id.to_string()))
            .map(|series| series.between(start, end))
            .ok_or_else(|| SourceError::NotFound {
                entity_id: entity_id.to_string(),
                metric_id: metric_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricObservation;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_source() -> StaticDataSource {
        StaticDataSource::new().with_series(MetricSeries::new(
            "MSFT",
            "pe_ratio",
            vec![
                MetricObservation::new(date(2024, 3, 31), 35.0),
                MetricObservation::new(date(2024, 6, 30), 36.0),
                MetricObservation::new(date(2024, 9, 30), 34.0),
                MetricObservation::new(date(2024, 12, 20), 37.5),
            ],
        ))
    }

    #[tokio::test]
    async fn test_fetch_filters_date_range() {
        let source = sample_source();
        let series = source
            .fetch(
                "MSFT",
                "pe_ratio",
                date(2024, 4, 1),
                date(2024, 9, 30),
                Frequency::Quarterly,
            )
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.observations()[0].value, 36.0);
    }

    #[tokio::test]
    async fn test_unknown_pair_not_found() {
        let source = sample_source();
        let result = source
            .fetch(
                "AAPL",
                "pe_ratio",
                date(2020, 1, 1),
                date(2024, 12, 31),
                Frequency::Quarterly,
            )
            .await;

        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_latest_within_lookback() {
        let source = sample_source();

        let latest = source
            .latest("MSFT", "pe_ratio", date(2024, 12, 31), 30)
            .await
            .unwrap();
        assert_eq!(latest.map(|o| o.value), Some(37.5));

        // Nothing in the 30 days before mid-February
        let stale = source
            .latest("MSFT", "pe_ratio", date(2025, 2, 15), 30)
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn test_load_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"series": [{{"entity_id": "JNJ", "metric_id": "dividend_yield",
                "observations": [{{"date": "2024-06-30", "value": 0.031}}]}}]}}"#
        )
        .unwrap();

        let source = StaticDataSource::load(file.path()).await.unwrap();
        assert_eq!(source.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = StaticDataSource::load(Path::new("/nonexistent/fixture.json")).await;
        assert!(matches!(result, Err(SourceError::Fixture(_))));
    }
}
