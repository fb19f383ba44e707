//! Standardized deviation of a current value from windowed history

use serde::{Deserialize, Serialize};

use super::statistics::{windowed_statistics, WindowStats};
use super::window::WindowSet;
use crate::models::MetricSeries;

/// Deviation of the current value within one lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDeviation {
    pub window: String,
    /// `(current - mean) / std_dev`, or zero for a flat window
    pub deviation: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub observations: usize,
}

/// Per-window deviations, in window configuration order.
///
/// A window only appears when the series had enough history for it, so an
/// absent window means "insufficient history", never "no deviation".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviationResult {
    entries: Vec<WindowDeviation>,
}

impl DeviationResult {
    /// Deviation for a window, if it was computable
    pub fn get(&self, window: &str) -> Option<f64> {
        self.window(window).map(|d| d.deviation)
    }

    pub fn window(&self, window: &str) -> Option<&WindowDeviation> {
        self.entries.iter().find(|d| d.window == window)
    }

    pub fn contains(&self, window: &str) -> bool {
        self.window(window).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowDeviation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Standardized deviation of `current` from a window.
///
/// A flat window (zero standard deviation) yields zero: a series that never
/// moved offers no scale to measure a deviation against.
pub fn standardized_deviation(current: f64, stats: &WindowStats) -> f64 {
    if stats.is_flat() {
        return 0.0;
    }
    (current - stats.mean) / stats.std_dev
}

/// Deviation of `current` from every computable window of `series`
pub fn compute_deviation(series: &MetricSeries, current: f64, windows: &WindowSet) -> DeviationResult {
    let entries = windowed_statistics(series, windows)
        .into_iter()
        .map(|(window, stats)| WindowDeviation {
            window: window.name.clone(),
            deviation: standardized_deviation(current, &stats),
            mean: stats.mean,
            std_dev: stats.std_dev,
            observations: stats.count,
        })
        .collect();

    DeviationResult { entries }
}
