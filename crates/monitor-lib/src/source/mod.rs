//! Historical market data sources
//!
//! The monitor never talks to a provider directly. It is handed an
//! implementation of [`HistoricalDataSource`] and treats any failure from
//! it as "no data" for the affected metric.

mod fixture;
mod http;

pub use fixture::StaticDataSource;
pub use http::{HttpDataSource, HttpSourceConfig};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{MetricObservation, MetricSeries};

pub use async_trait::async_trait;

/// Sampling frequency requested from a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    #[default]
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a series could not be retrieved
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data for {entity_id}/{metric_id}")]
    NotFound { entity_id: String, metric_id: String },

    #[error("provider returned HTTP {status} for {entity_id}/{metric_id}")]
    Status {
        status: u16,
        entity_id: String,
        metric_id: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid provider response: {0}")]
    Decode(String),

    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("failed to load fixture: {0}")]
    Fixture(String),
}

/// Trait for historical data retrieval implementations
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch observations dated within `[start, end]`
    async fn fetch(
        &self,
        entity_id: &str,
        metric_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<MetricSeries, SourceError>;

    /// Most recent daily observation within `lookback_days` of `as_of`
    async fn latest(
        &self,
        entity_id: &str,
        metric_id: &str,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<MetricObservation>, SourceError> {
        let start = as_of
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        let series = self
            .fetch(entity_id, metric_id, start, as_of, Frequency::Daily)
            .await?;
        Ok(series.latest().copied())
    }
}
