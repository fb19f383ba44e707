//! Windowed statistics over the tail of a metric series

use serde::{Deserialize, Serialize};

use super::window::{LookbackWindow, WindowSet};
use crate::models::MetricSeries;

/// Mean and sample standard deviation of one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
    /// Number of observations the statistics were computed over
    pub count: usize,
}

impl WindowStats {
    /// True when every value in the window is identical
    pub fn is_flat(&self) -> bool {
        self.std_dev == 0.0
    }
}

/// Statistics over the trailing `k` observations of `series`.
///
/// Returns `None` when `k` is zero or fewer than `k` observations exist.
/// The standard deviation uses Bessel's correction. A window whose values
/// are all identical has a standard deviation of exactly zero, even where
/// rounding in the mean would leave a residue.
pub fn trailing_stats(series: &MetricSeries, k: usize) -> Option<WindowStats> {
    if k == 0 {
        return None;
    }
    let tail = series.tail(k)?;
    let mean = tail.iter().map(|o| o.value).sum::<f64>() / k as f64;

    // Two-pass variance for stability
    let std_dev = if tail.iter().all(|o| o.value == tail[0].value) {
        0.0
    } else {
        let variance = tail.iter().map(|o| (o.value - mean).powi(2)).sum::<f64>() / (k - 1) as f64;
        variance.sqrt()
    };

    Some(WindowStats {
        mean,
        std_dev,
        count: k,
    })
}

/// Statistics for every window the series has enough history for, in
/// window configuration order. Windows with insufficient history are
/// omitted.
pub fn windowed_statistics<'w>(
    series: &MetricSeries,
    windows: &'w WindowSet,
) -> Vec<(&'w LookbackWindow, WindowStats)> {
    windows
        .iter()
        .filter_map(|w| trailing_stats(series, w.observations).map(|s| (w, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricObservation;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> MetricSeries {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        MetricSeries::new(
            "MSFT",
            "pe_ratio",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    MetricObservation::new(start + chrono::Days::new(91 * i as u64), *v)
                })
                .collect(),
        )
    }

    #[test]
    fn test_window_absent_when_history_short() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert!(trailing_stats(&s, 4).is_none());
        assert!(trailing_stats(&s, 3).is_some());
    }

    #[test]
    fn test_zero_window_not_computable() {
        let s = series(&[1.0, 2.0]);
        assert!(trailing_stats(&s, 0).is_none());
    }

    #[test]
    fn test_uses_only_trailing_points() {
        // Leading outliers must not influence the last-4 window
        let s = series(&[1000.0, -1000.0, 2.0, 4.0, 4.0, 6.0]);
        let stats = trailing_stats(&s, 4).unwrap();

        assert!((stats.mean - 4.0).abs() < 1e-12);
        // Sample variance: (4 + 0 + 0 + 4) / 3
        assert!((stats.std_dev - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.count, 4);
    }

    #[test]
    fn test_single_observation_has_zero_std() {
        let s = series(&[5.0, 7.0]);
        let stats = trailing_stats(&s, 1).unwrap();
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.std_dev, 0.0);
        assert!(stats.is_flat());
    }

    #[test]
    fn test_constant_series_is_flat() {
        let s = series(&[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]);
        let stats = trailing_stats(&s, 7).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert!(stats.is_flat());
    }

    #[test]
    fn test_small_magnitude_spread_is_not_flat() {
        let s = series(&[1e-17, 2e-17, 3e-17, 4e-17]);
        let stats = trailing_stats(&s, 4).unwrap();

        assert!(!stats.is_flat());
        assert!((stats.mean - 2.5e-17).abs() < 1e-30);
        // Sample std of 1..4 is sqrt(5/3), scaled by 1e-17
        let expected = (5.0f64 / 3.0).sqrt() * 1e-17;
        assert!((stats.std_dev - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn test_windowed_statistics_length_two() {
        let s = series(&[10.0, 12.0]);
        let windows = WindowSet::default();
        let stats = windowed_statistics(&s, &windows);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].0.name, "Last Quarter");
        assert_eq!(stats[0].1.mean, 12.0);
    }

    #[test]
    fn test_windowed_statistics_presence_matches_length() {
        let windows = WindowSet::default();
        for n in 0..=25 {
            let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let s = series(&values);
            let stats = windowed_statistics(&s, &windows);

            for window in windows.iter() {
                let present = stats.iter().any(|(w, _)| w.name == window.name);
                assert_eq!(present, n >= window.observations, "n={} window={}", n, window.name);
            }
        }
    }
}
