//! API client for the monitor service

use anyhow::{Context, Result};
use chrono::NaiveDate;
use monitor_lib::{Holding, HoldingReport, MetricDefinition, PortfolioReport};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        // Relative joins replace the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// GET `path` with the given query parameters; `None` values are omitted
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<String>)],
    ) -> Result<T> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn catalog(&self) -> Result<Vec<MetricDefinition>> {
        self.get("api/v1/catalog", &[]).await
    }

    pub async fn portfolio(&self, sector: Option<&str>) -> Result<Vec<Holding>> {
        self.get("api/v1/portfolio", &[("sector", sector.map(str::to_string))])
            .await
    }

    pub async fn evaluate(
        &self,
        sector: Option<&str>,
        as_of: Option<NaiveDate>,
    ) -> Result<PortfolioReport> {
        self.get(
            "api/v1/evaluate",
            &[
                ("sector", sector.map(str::to_string)),
                ("as_of", as_of.map(|d| d.to_string())),
            ],
        )
        .await
    }

    pub async fn holding(&self, ticker: &str, as_of: Option<NaiveDate>) -> Result<HoldingReport> {
        let path = format!("api/v1/holdings/{}/evaluate", ticker);
        self.get(&path, &[("as_of", as_of.map(|d| d.to_string()))])
            .await
    }
}
