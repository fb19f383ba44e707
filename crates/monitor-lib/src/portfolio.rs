//! Portfolio holdings and sector filtering

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One instrument in the portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    #[serde(default)]
    pub industry: String,
}

impl Holding {
    pub fn new(ticker: &str, name: &str, sector: &str, industry: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            industry: industry.to_string(),
        }
    }
}

/// Ordered, validated list of holdings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Holding>", into = "Vec<Holding>")]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Result<Self, ConfigError> {
        if holdings.is_empty() {
            return Err(ConfigError::EmptyPortfolio);
        }
        for (i, holding) in holdings.iter().enumerate() {
            if holdings[..i]
                .iter()
                .any(|h| h.ticker.eq_ignore_ascii_case(&holding.ticker))
            {
                return Err(ConfigError::DuplicateHolding {
                    ticker: holding.ticker.clone(),
                });
            }
        }
        Ok(Self { holdings })
    }

    /// Look up a holding by ticker, ignoring case
    pub fn get(&self, ticker: &str) -> Option<&Holding> {
        self.holdings
            .iter()
            .find(|h| h.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Holdings matching the filter, in portfolio order
    pub fn select(&self, filter: &SectorFilter) -> Vec<&Holding> {
        self.holdings.iter().filter(|h| filter.matches(h)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            holdings: vec![
                Holding::new("MSFT", "Microsoft", "Technology", "Software"),
                Holding::new("AAPL", "Apple", "Technology", "Hardware"),
                Holding::new("AMZN", "Amazon", "Consumer Cyclical", "Internet Retail"),
                Holding::new("JPM", "JP Morgan", "Financial", "Banks"),
                Holding::new("JNJ", "Johnson & Johnson", "Healthcare", "Pharmaceuticals"),
            ],
        }
    }
}

impl TryFrom<Vec<Holding>> for Portfolio {
    type Error = ConfigError;

    fn try_from(holdings: Vec<Holding>) -> Result<Self, Self::Error> {
        Self::new(holdings)
    }
}

impl From<Portfolio> for Vec<Holding> {
    fn from(portfolio: Portfolio) -> Self {
        portfolio.holdings
    }
}

/// Sector selection. An empty filter selects every holding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorFilter {
    sectors: Vec<String>,
}

impl SectorFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sectors: sectors
                .into_iter()
                .map(Into::into)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list, e.g. `Technology,Healthcare`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn matches(&self, holding: &Holding) -> bool {
        self.sectors.is_empty()
            || self
                .sectors
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&holding.sector))
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}
