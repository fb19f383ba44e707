//! Engine configuration
//!
//! Lookback windows, alert thresholds and the data-retrieval horizon. Every
//! field has a default, so an empty `[engine]` table yields a working
//! monitor. [`EngineConfig::validate`] must pass before evaluation starts.

use serde::{Deserialize, Serialize};

use crate::engine::{SeverityThresholds, WindowSet};
use crate::error::ConfigError;
use crate::source::Frequency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lookback windows, in reporting order
    pub windows: WindowSet,

    /// Window whose mean serves as the historical reference
    pub reference_window: String,

    /// Years of history requested per series
    pub lookback_years: u32,

    /// Sampling frequency requested for history
    pub frequency: Frequency,

    /// How far back to look for a current value
    pub current_value_days: u32,

    /// Tiers for standardized deviations, in sigma
    pub deviation_thresholds: SeverityThresholds,

    /// Tiers for percent changes, in percent
    pub percent_thresholds: SeverityThresholds,

    /// Also raise percent-change alerts against the peer-group reference
    pub peer_alerts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: WindowSet::default(),
            reference_window: "Last Year".to_string(),
            lookback_years: 5,
            frequency: Frequency::Quarterly,
            current_value_days: 30,
            deviation_thresholds: SeverityThresholds::deviation_default(),
            percent_thresholds: SeverityThresholds::percent_default(),
            peer_alerts: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.windows.contains(&self.reference_window) {
            return Err(ConfigError::UnknownReferenceWindow {
                name: self.reference_window.clone(),
            });
        }
        if self.deviation_thresholds.is_empty() {
            return Err(ConfigError::EmptyThresholds {
                path: "engine.deviation_thresholds",
            });
        }
        if self.percent_thresholds.is_empty() {
            return Err(ConfigError::EmptyThresholds {
                path: "engine.percent_thresholds",
            });
        }
        if self.lookback_years == 0 {
            return Err(ConfigError::NonPositive {
                field: "engine.lookback_years",
            });
        }
        if self.current_value_days == 0 {
            return Err(ConfigError::NonPositive {
                field: "engine.current_value_days",
            });
        }
        Ok(())
    }
}
