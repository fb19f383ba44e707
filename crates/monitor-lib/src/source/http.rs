//! JSON-over-HTTP market data source
//!
//! Requests `GET {base}/securities/{ticker}/historical_data/{metric}` with
//! `start_date`, `end_date`, `frequency` and an optional `api_key` query
//! parameter. The response carries `{"historical_data": [{date, value}]}`;
//! points with a null value are skipped.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{async_trait, Frequency, HistoricalDataSource, SourceError};
use crate::models::{MetricObservation, MetricSeries};

/// Configuration for the HTTP data source
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Provider base URL (e.g., "https://api-v2.intrinio.com")
    pub base_url: String,
    /// API key sent as the `api_key` query parameter
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-v2.intrinio.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct HistoricalDataResponse {
    #[serde(default)]
    historical_data: Vec<HistoricalPoint>,
}

#[derive(Deserialize)]
struct HistoricalPoint {
    date: NaiveDate,
    value: Option<f64>,
}

/// Data source backed by a JSON HTTP provider
pub struct HttpDataSource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDataSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn series_url(
        &self,
        entity_id: &str,
        metric_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["securities", entity_id, "historical_data", metric_id]);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("start_date", &start.format("%Y-%m-%d").to_string())
                .append_pair("end_date", &end.format("%Y-%m-%d").to_string())
                .append_pair("frequency", frequency.as_str());
            if let Some(key) = &self.api_key {
                query.append_pair("api_key", key);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl HistoricalDataSource for HttpDataSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        entity_id: &str,
        metric_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<MetricSeries, SourceError> {
        let url = self.series_url(entity_id, metric_id, start, end, frequency)?;
        debug!(entity_id, metric_id, %frequency, "Fetching historical data");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                entity_id: entity_id.to_string(),
                metric_id: metric_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                entity_id: entity_id.to_string(),
                metric_id: metric_id.to_string(),
            });
        }

        let body = response.bytes().await?;
        let parsed: HistoricalDataResponse =
            serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

        let observations = parsed
            .historical_data
            .into_iter()
            .filter_map(|p| p.value.map(|v| MetricObservation::new(p.date, v)))
            .collect();

        Ok(MetricSeries::new(entity_id, metric_id, observations))
    }
}
