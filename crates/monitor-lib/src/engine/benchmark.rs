//! Current vs. historical vs. peer-group comparison

use crate::models::ComparisonRecord;

/// Percent change of `current` relative to `reference`.
///
/// Defined as zero when the reference is zero, so a missing or zero
/// baseline never produces an infinite change.
pub fn percent_change(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    (current - reference) / reference * 100.0
}

/// Package a three-way comparison for one entity/metric pair.
///
/// Both references are chosen by the caller; nothing is computed here
/// beyond the percent changes.
pub fn compare(
    entity_id: &str,
    metric_id: &str,
    current: f64,
    historical_reference: f64,
    peer_reference: f64,
) -> ComparisonRecord {
    ComparisonRecord {
        entity_id: entity_id.to_string(),
        metric_id: metric_id.to_string(),
        current,
        historical_reference,
        peer_reference,
        percent_change: percent_change(current, historical_reference),
        peer_percent_change: percent_change(current, peer_reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change() {
        assert!((percent_change(110.0, 100.0) - 10.0).abs() < 1e-12);
        assert!((percent_change(90.0, 100.0) + 10.0).abs() < 1e-12);
        // Negative reference keeps the arithmetic sign convention
        assert!((percent_change(-5.0, -10.0) + 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_reference_is_zero() {
        assert_eq!(percent_change(50.0, 0.0), 0.0);
        assert_eq!(percent_change(-3.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_compare_packages_record() {
        let record = compare("JPM", "pe_ratio", 12.0, 10.0, 15.0);

        assert_eq!(record.entity_id, "JPM");
        assert_eq!(record.metric_id, "pe_ratio");
        assert_eq!(record.current, 12.0);
        assert_eq!(record.historical_reference, 10.0);
        assert_eq!(record.peer_reference, 15.0);
        assert!((record.percent_change - 20.0).abs() < 1e-12);
        assert!((record.peer_percent_change + 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_compare_zero_historical_reference() {
        let record = compare("JPM", "dividend_yield", 50.0, 0.0, 40.0);
        assert_eq!(record.percent_change, 0.0);
        assert!(record.percent_change.is_finite());
    }
}
