//! Portfolio Fundamentals Monitor CLI
//!
//! A command-line tool for browsing the monitored portfolio and running
//! deviation and alert evaluations against the monitor service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::{evaluate, portfolio};
use output::{AlertKind, OutputFormat};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Portfolio Fundamentals Monitor CLI
#[derive(Parser)]
#[command(name = "pmon")]
#[command(author, version, about = "CLI for the Portfolio Fundamentals Monitor", long_about = None)]
pub struct Cli {
    /// Monitor API URL (can also be set via PMON_API_URL env var)
    #[arg(long, env = "PMON_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tracked metrics
    Catalog,

    /// List portfolio holdings
    Portfolio {
        /// Comma-separated sectors to include
        #[arg(long, short)]
        sector: Option<String>,
    },

    /// Evaluate holdings against their history and sector peers
    Evaluate {
        /// Comma-separated sectors to include
        #[arg(long, short)]
        sector: Option<String>,

        /// Evaluation date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show the full evaluation of a single holding
    Holding {
        /// Ticker symbol
        ticker: String,

        /// Evaluation date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// List raised alerts
    Alerts {
        /// Comma-separated sectors to include
        #[arg(long, short)]
        sector: Option<String>,

        /// Only show alerts of this severity (e.g. high)
        #[arg(long)]
        severity: Option<String>,

        /// Only show alerts against this benchmark
        #[arg(long)]
        kind: Option<AlertKind>,

        /// Evaluation date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli.format.unwrap_or_else(|| config.format());

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Catalog => {
            portfolio::show_catalog(&client, format).await?;
        }
        Commands::Portfolio { sector } => {
            let sector = sector.or(config.default_sector);
            portfolio::show_portfolio(&client, sector.as_deref(), format).await?;
        }
        Commands::Evaluate { sector, as_of } => {
            let sector = sector.or(config.default_sector);
            evaluate::show_evaluation(&client, sector.as_deref(), as_of, format).await?;
        }
        Commands::Holding { ticker, as_of } => {
            evaluate::show_holding(&client, &ticker, as_of, format).await?;
        }
        Commands::Alerts {
            sector,
            severity,
            kind,
            as_of,
        } => {
            let sector = sector.or(config.default_sector);
            let filter = evaluate::AlertFilter { severity, kind };
            evaluate::show_alerts(&client, sector.as_deref(), as_of, &filter, format).await?;
        }
    }

    Ok(())
}
