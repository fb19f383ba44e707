//! Catalog and portfolio listings

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Format")]
    format: String,
}

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Company")]
    name: String,
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Industry")]
    industry: String,
}

pub async fn show_catalog(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let catalog = client.catalog().await?;

    match format {
        OutputFormat::Json => print_json(&catalog)?,
        OutputFormat::Table => {
            let rows = catalog
                .into_iter()
                .map(|m| MetricRow {
                    format: format!("{:?}", m.format).to_lowercase(),
                    id: m.id,
                    name: m.display_name,
                })
                .collect();
            print_table::<MetricRow>(rows, "No metrics configured");
        }
    }

    Ok(())
}

pub async fn show_portfolio(
    client: &ApiClient,
    sector: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let holdings = client.portfolio(sector).await?;

    match format {
        OutputFormat::Json => print_json(&holdings)?,
        OutputFormat::Table => {
            let total = holdings.len();
            let rows = holdings
                .into_iter()
                .map(|h| HoldingRow {
                    ticker: h.ticker,
                    name: h.name,
                    sector: h.sector,
                    industry: h.industry,
                })
                .collect();
            print_table::<HoldingRow>(rows, "No holdings match the sector filter");
            if total > 0 {
                println!("\nTotal: {} holdings", total);
            }
        }
    }

    Ok(())
}
