//! Severity classification of discrepancy percentages

use crate::config::SeverityThresholds;
use crate::Severity;
use rust_decimal::Decimal;

/// Map a discrepancy percentage onto a severity tier
///
/// Cut points are inclusive and checked from the top down. There is no
/// floor: anything below `medium` is LOW, so `thresholds.low` never changes
/// the outcome.
pub fn determine_severity(discrepancy_percentage: Decimal, thresholds: &SeverityThresholds) -> Severity {
    if discrepancy_percentage >= thresholds.critical {
        Severity::Critical
    } else if discrepancy_percentage >= thresholds.high {
        Severity::High
    } else if discrepancy_percentage >= thresholds.medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

impl SeverityThresholds {
    /// See [`determine_severity`]
    pub fn classify(&self, discrepancy_percentage: Decimal) -> Severity {
        determine_severity(discrepancy_percentage, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_tiers() {
        let thresholds = SeverityThresholds::default();

        assert_eq!(thresholds.classify(dec!(0.5)), Severity::Low);
        assert_eq!(thresholds.classify(dec!(4.99)), Severity::Low);
        assert_eq!(thresholds.classify(dec!(7)), Severity::Medium);
        assert_eq!(thresholds.classify(dec!(12)), Severity::High);
        assert_eq!(thresholds.classify(dec!(25)), Severity::Critical);
    }

    #[test]
    fn test_boundaries_belong_to_upper_tier() {
        let thresholds = SeverityThresholds::default();

        assert_eq!(thresholds.classify(dec!(5)), Severity::Medium);
        assert_eq!(thresholds.classify(dec!(10)), Severity::High);
        assert_eq!(thresholds.classify(dec!(20)), Severity::Critical);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = SeverityThresholds {
            low: dec!(0.1),
            medium: dec!(0.5),
            high: dec!(1),
            critical: dec!(2),
        };

        assert_eq!(determine_severity(dec!(0.3), &thresholds), Severity::Low);
        assert_eq!(determine_severity(dec!(1.5), &thresholds), Severity::High);
        assert_eq!(determine_severity(dec!(2), &thresholds), Severity::Critical);
    }
}
