//! Threshold-driven alert classification
//!
//! One evaluator serves both alert paths: standardized deviations measured
//! in sigma and percent changes measured in percent. Each path carries its
//! own ordered tier configuration, so the units never mix.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Alert, BenchmarkKind, FigureUnit};

/// A named alert level keyed to a minimum magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityTier {
    pub name: String,
    pub magnitude: f64,
}

impl SeverityTier {
    pub fn new(name: impl Into<String>, magnitude: f64) -> Self {
        Self {
            name: name.into(),
            magnitude,
        }
    }
}

/// Severity tiers ordered from least to most severe.
///
/// Magnitudes are finite, non-negative and strictly ascending. A figure
/// lands in the highest tier whose magnitude it strictly exceeds, so a
/// figure exactly on a boundary stays in the tier below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SeverityTier>", into = "Vec<SeverityTier>")]
pub struct SeverityThresholds {
    tiers: Vec<SeverityTier>,
}

impl SeverityThresholds {
    pub fn new(tiers: Vec<SeverityTier>) -> Result<Self, ConfigError> {
        for (i, tier) in tiers.iter().enumerate() {
            if !tier.magnitude.is_finite() || tier.magnitude < 0.0 {
                return Err(ConfigError::InvalidMagnitude {
                    name: tier.name.clone(),
                    magnitude: tier.magnitude,
                });
            }
            if tiers[..i].iter().any(|t| t.name == tier.name) {
                return Err(ConfigError::DuplicateTier {
                    name: tier.name.clone(),
                });
            }
            if let Some(previous) = i.checked_sub(1).map(|p| &tiers[p]) {
                if tier.magnitude <= previous.magnitude {
                    return Err(ConfigError::NonAscendingTiers {
                        name: tier.name.clone(),
                        magnitude: tier.magnitude,
                        previous: previous.magnitude,
                    });
                }
            }
        }

        Ok(Self { tiers })
    }

    /// Build from `(name, magnitude)` pairs, least severe first
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, magnitude)| SeverityTier::new(name, magnitude))
                .collect(),
        )
    }

    /// No tiers: nothing ever fires
    pub fn none() -> Self {
        Self { tiers: Vec::new() }
    }

    /// 5σ significance gate for deviation alerts
    pub fn deviation_default() -> Self {
        Self {
            tiers: vec![SeverityTier::new("significant", 5.0)],
        }
    }

    /// 5% gate with a 10% high/medium split for percent-change alerts
    pub fn percent_default() -> Self {
        Self {
            tiers: vec![
                SeverityTier::new("medium", 5.0),
                SeverityTier::new("high", 10.0),
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeverityTier> {
        self.tiers.iter()
    }

    /// Tier for a magnitude, with its rank (0 = least severe)
    pub fn classify(&self, magnitude: f64) -> Option<(usize, &SeverityTier)> {
        self.tiers
            .iter()
            .enumerate()
            .rev()
            .find(|(_, tier)| magnitude > tier.magnitude)
    }
}

impl TryFrom<Vec<SeverityTier>> for SeverityThresholds {
    type Error = ConfigError;

    fn try_from(tiers: Vec<SeverityTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<SeverityThresholds> for Vec<SeverityTier> {
    fn from(thresholds: SeverityThresholds) -> Self {
        thresholds.tiers
    }
}

/// Everything the evaluator needs to know about one figure
#[derive(Debug, Clone, Copy)]
pub struct AlertInput<'a> {
    pub entity_id: &'a str,
    pub metric_id: &'a str,
    pub current_value: f64,
    /// `None` when the figure could not be computed (insufficient history)
    pub figure: Option<f64>,
    pub benchmark_value: f64,
    pub benchmark_kind: BenchmarkKind,
    pub unit: FigureUnit,
    pub window: Option<&'a str>,
}

/// Classify one figure against `thresholds`.
///
/// Returns a fresh list holding at most one alert. Nothing fires for an
/// absent figure or an empty threshold set.
pub fn evaluate_alerts(input: &AlertInput<'_>, thresholds: &SeverityThresholds) -> Vec<Alert> {
    let Some(figure) = input.figure else {
        return Vec::new();
    };

    let Some((rank, tier)) = thresholds.classify(figure.abs()) else {
        return Vec::new();
    };

    vec![Alert {
        entity_id: input.entity_id.to_string(),
        metric_id: input.metric_id.to_string(),
        current_value: input.current_value,
        benchmark_value: input.benchmark_value,
        benchmark_kind: input.benchmark_kind,
        figure,
        unit: input.unit,
        severity: tier.name.clone(),
        highest_tier: rank + 1 == thresholds.tiers.len(),
        window: input.window.map(str::to_string),
        message: alert_message(input, figure),
    }]
}

fn alert_message(input: &AlertInput<'_>, figure: f64) -> String {
    match input.unit {
        FigureUnit::Sigma => format!(
            "{}: {:.2}σ deviation from {} average ({:.2})",
            input.metric_id,
            figure,
            input.window.unwrap_or("historical"),
            input.benchmark_value
        ),
        FigureUnit::Percent => format!(
            "Current value ({:.2}) deviated by {:+.1}% from {} Average ({:.2})",
            input.current_value, figure, input.benchmark_kind, input.benchmark_value
        ),
    }
}
