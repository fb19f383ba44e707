//! Metric deviation and alerting engine
//!
//! Stateless building blocks, leaves first:
//! - Windowed statistics over the tail of a series
//! - Standardized deviation per lookback window
//! - Current vs. historical vs. peer-group comparison
//! - Ordered-threshold alert classification
//!
//! Every function here is a pure mapping of its inputs, so entity/metric
//! pairs can be evaluated in parallel without coordination.

mod alerts;
mod benchmark;
mod deviation;
mod statistics;
mod window;

pub use alerts::{evaluate_alerts, AlertInput, SeverityThresholds, SeverityTier};
pub use benchmark::{compare, percent_change};
pub use deviation::{compute_deviation, standardized_deviation, DeviationResult, WindowDeviation};
pub use statistics::{trailing_stats, windowed_statistics, WindowStats};
pub use window::{LookbackWindow, WindowSet};
