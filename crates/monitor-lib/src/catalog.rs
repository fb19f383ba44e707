//! Metric catalog
//!
//! The list of fundamental/valuation metrics the monitor tracks, with the
//! display name and value format a consumer needs to present them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a metric's values are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// Valuation multiple, e.g. `31.25x`
    Multiple,
    /// Fraction shown as a percentage, e.g. `0.253` as `25.3%`
    Percent,
    #[default]
    Plain,
}

impl ValueFormat {
    pub fn render(&self, value: f64) -> String {
        match self {
            ValueFormat::Multiple => format!("{:.2}x", value),
            ValueFormat::Percent => format!("{:.1}%", value * 100.0),
            ValueFormat::Plain => format!("{:.2}", value),
        }
    }
}

/// One tracked metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Provider identifier, e.g. `pe_ratio`
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub format: ValueFormat,
}

impl MetricDefinition {
    pub fn new(id: &str, display_name: &str, format: ValueFormat) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            format,
        }
    }
}

/// Ordered, validated list of tracked metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MetricDefinition>", into = "Vec<MetricDefinition>")]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(metrics: Vec<MetricDefinition>) -> Result<Self, ConfigError> {
        if metrics.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        for (i, metric) in metrics.iter().enumerate() {
            if metrics[..i].iter().any(|m| m.id == metric.id) {
                return Err(ConfigError::DuplicateMetric {
                    id: metric.id.clone(),
                });
            }
        }
        Ok(Self { metrics })
    }

    pub fn get(&self, id: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        use ValueFormat::*;

        let metrics = [
            ("pe_ratio", "PE Ratio", Multiple),
            ("ev_to_ebitda", "EV/EBITDA", Multiple),
            ("price_to_book_value", "P/B Ratio", Multiple),
            ("ev_to_sales", "EV/Sales", Multiple),
            ("gross_margin", "Gross Margin", Percent),
            ("operating_margin", "Operating Margin", Percent),
            ("ebitda_margin", "EBITDA Margin", Percent),
            ("net_margin", "Profit Margin", Percent),
            ("revenue_growth_yoy", "Revenue Growth (YoY)", Percent),
            ("revenue_growth_qoq", "Revenue Growth (QoQ)", Percent),
            ("dividend_yield", "Dividend Yield", Percent),
            ("forward_pe_ratio", "Forward P/E", Multiple),
            ("forward_ev_to_ebitda", "Forward EV/EBITDA", Multiple),
            ("current_ratio", "Current Ratio", Plain),
            ("quick_ratio", "Quick Ratio", Plain),
            ("interest_coverage", "Interest Coverage", Multiple),
        ];

        Self {
            metrics: metrics
                .into_iter()
                .map(|(id, name, format)| MetricDefinition::new(id, name, format))
                .collect(),
        }
    }
}

impl TryFrom<Vec<MetricDefinition>> for MetricCatalog {
    type Error = ConfigError;

    fn try_from(metrics: Vec<MetricDefinition>) -> Result<Self, Self::Error> {
        Self::new(metrics)
    }
}

impl From<MetricCatalog> for Vec<MetricDefinition> {
    fn from(catalog: MetricCatalog) -> Self {
        catalog.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = MetricCatalog::default();
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog.get("net_margin").unwrap().display_name, "Profit Margin");
        assert!(MetricCatalog::new(catalog.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(ValueFormat::Multiple.render(31.254), "31.25x");
        assert_eq!(ValueFormat::Percent.render(0.253), "25.3%");
        assert_eq!(ValueFormat::Plain.render(1.5), "1.50");
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let result = MetricCatalog::new(vec![
            MetricDefinition::new("pe_ratio", "PE", ValueFormat::Multiple),
            MetricDefinition::new("pe_ratio", "PE again", ValueFormat::Multiple),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateMetric { .. })));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert_eq!(MetricCatalog::new(vec![]), Err(ConfigError::EmptyCatalog));
    }
}
