//! Per-field validation rules
//!
//! Each evaluator recomputes one field of a record and reports a finding
//! when the stated value differs from the recomputed one by more than the
//! configured tolerance. Calculation failures become CRITICAL findings; they
//! never abort the record.

use crate::calculation::{
    calculate_line_item_total, calculate_percentage_difference, calculate_tax, calculate_total,
    discount_at_rate, implied_discount_rate,
};
use crate::config::ValidationConfig;
use crate::input::RecordInput;
use crate::{FindingOutcome, InvoiceRecord, Result, Severity, ValidationField, ValidationResult};
use rust_decimal::Decimal;
use tracing::debug;

/// How a finding's severity is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeverityPolicy {
    /// From the discrepancy percentage and the configured thresholds
    ByPercentage,
    /// Fixed tier regardless of percentage
    Fixed(Severity),
}

/// Severity for every line-item mismatch
pub const LINE_ITEM_SEVERITY: Severity = Severity::High;

struct FieldCheck<'a> {
    record_id: &'a str,
    field: ValidationField,
    label: &'a str,
    original: Decimal,
    tolerance: Decimal,
    policy: SeverityPolicy,
}

impl FieldCheck<'_> {
    fn run(self, expected: Result<Decimal>, config: &ValidationConfig) -> Option<ValidationResult> {
        let failed = |reason: String| {
            Some(ValidationResult::calculation_failed(
                self.record_id,
                self.field,
                self.original,
                reason,
            ))
        };

        let expected = match expected {
            Ok(expected) => expected,
            Err(e) => return failed(e.to_string()),
        };

        let discrepancy = match self.original.checked_sub(expected) {
            Some(difference) => difference.abs(),
            None => return failed(format!("{} difference overflowed", self.label)),
        };

        if discrepancy <= self.tolerance {
            return None;
        }

        let discrepancy_percentage = match calculate_percentage_difference(self.original, expected) {
            Ok(percentage) => percentage,
            Err(e) => return failed(e.to_string()),
        };

        let severity = match self.policy {
            SeverityPolicy::ByPercentage => config.thresholds.classify(discrepancy_percentage),
            SeverityPolicy::Fixed(severity) => severity,
        };

        Some(ValidationResult {
            record_id: self.record_id.to_string(),
            field: self.field,
            original_value: Some(self.original),
            message: format!(
                "{} mismatch: expected {}, found {} (difference {}, {}%)",
                self.label,
                expected,
                self.original,
                discrepancy,
                discrepancy_percentage.round_dp(2)
            ),
            outcome: FindingOutcome::Calculated {
                calculated_value: expected,
                discrepancy,
                discrepancy_percentage,
            },
            severity,
        })
    }
}

/// Recompute tax from the tax rate; skipped when the rate is absent or zero
pub fn evaluate_tax(record: &InvoiceRecord, config: &ValidationConfig) -> Option<ValidationResult> {
    let tax_rate = record.tax_rate.filter(|rate| !rate.is_zero())?;
    let expected = calculate_tax(record.amount, tax_rate, &config.calculation_options());

    FieldCheck {
        record_id: &record.id,
        field: ValidationField::TaxAmount,
        label: "Tax amount",
        original: record.tax_amount,
        tolerance: config.tolerances.tax_calculation,
        policy: SeverityPolicy::ByPercentage,
    }
    .run(expected, config)
}

/// Check the stated total against the record's own amount, tax and discount
pub fn evaluate_total(record: &InvoiceRecord, config: &ValidationConfig) -> Option<ValidationResult> {
    let expected = calculate_total(
        record.amount,
        record.tax_amount,
        record.discount_amount,
        &config.calculation_options(),
    );

    FieldCheck {
        record_id: &record.id,
        field: ValidationField::TotalAmount,
        label: "Total amount",
        original: record.total_amount,
        tolerance: config.tolerances.total_calculation,
        policy: SeverityPolicy::ByPercentage,
    }
    .run(expected, config)
}

/// Re-derive the discount from its implied rate; runs only for positive discounts
pub fn evaluate_discount(record: &InvoiceRecord, config: &ValidationConfig) -> Option<ValidationResult> {
    if record.discount_amount <= Decimal::ZERO {
        return None;
    }

    let opts = config.calculation_options();
    let expected = implied_discount_rate(record.amount, record.discount_amount)
        .and_then(|rate| discount_at_rate(record.amount, rate, &opts));

    FieldCheck {
        record_id: &record.id,
        field: ValidationField::DiscountAmount,
        label: "Discount amount",
        original: record.discount_amount,
        tolerance: config.tolerances.discount_calculation,
        policy: SeverityPolicy::ByPercentage,
    }
    .run(expected, config)
}

/// Check quantity * unit price for every line item
pub fn evaluate_line_items(record: &InvoiceRecord, config: &ValidationConfig) -> Vec<ValidationResult> {
    let opts = config.calculation_options();

    record
        .line_items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let expected = calculate_line_item_total(item.quantity, item.unit_price, &opts);
            FieldCheck {
                record_id: &record.id,
                field: ValidationField::LineItem(index),
                label: "Line item total",
                original: item.line_total,
                tolerance: config.tolerances.line_item_calculation,
                policy: SeverityPolicy::Fixed(LINE_ITEM_SEVERITY),
            }
            .run(expected, config)
        })
        .collect()
}

/// Run every enabled evaluator against a record
pub fn evaluate_record(record: &InvoiceRecord, config: &ValidationConfig) -> Vec<ValidationResult> {
    let rules = &config.rules;
    let mut findings = Vec::new();

    if rules.validate_tax_calculation {
        findings.extend(evaluate_tax(record, config));
    }

    if rules.validate_total_calculation {
        findings.extend(evaluate_total(record, config));
    }

    if rules.validate_discount_calculation {
        findings.extend(evaluate_discount(record, config));
    }

    if rules.validate_line_item_totals && !record.line_items.is_empty() {
        findings.extend(evaluate_line_items(record, config));
    }

    if !findings.is_empty() {
        debug!(
            record_id = %record.id,
            findings = findings.len(),
            "Record has discrepancies"
        );
    }

    findings
}

/// Validate any record input; unreadable inputs yield one CRITICAL `general` finding
pub fn validate_input<R: RecordInput + ?Sized>(input: &R, config: &ValidationConfig) -> Vec<ValidationResult> {
    match input.to_invoice() {
        Ok(record) => evaluate_record(&record, config),
        Err(e) => {
            let record_id = input.record_id();
            debug!(record_id = %record_id, error = %e, "Record shape check failed");
            vec![ValidationResult::malformed_record(record_id, e.to_string())]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigUpdate, RuleTogglesUpdate, TolerancesUpdate};
    use crate::LineItem;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn config_with_tax_tolerance(tolerance: Decimal) -> ValidationConfig {
        ValidationConfig::default().merged(&ConfigUpdate::tolerances(TolerancesUpdate {
            tax_calculation: Some(tolerance),
            ..Default::default()
        }))
    }

    #[test]
    fn test_tax_within_tolerance_boundary() {
        let config = config_with_tax_tolerance(dec!(1.0));
        let record = InvoiceRecord::new("INV-1", dec!(100), dec!(11.00), dec!(111.00)).with_tax_rate(dec!(10));

        assert!(evaluate_tax(&record, &config).is_none());
    }

    #[test]
    fn test_tax_one_cent_over_tolerance() {
        let config = config_with_tax_tolerance(dec!(1.0));
        let record = InvoiceRecord::new("INV-1", dec!(100), dec!(11.01), dec!(111.01)).with_tax_rate(dec!(10));

        let finding = evaluate_tax(&record, &config).unwrap();
        assert_eq!(finding.field, ValidationField::TaxAmount);
        assert_eq!(finding.outcome.discrepancy(), Some(dec!(1.01)));
        assert_eq!(finding.outcome.calculated_value(), Some(dec!(10.00)));
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_tax_skipped_without_rate() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-2", dec!(100), dec!(50), dec!(150));
        assert!(evaluate_tax(&record, &config).is_none());

        let record = record.with_tax_rate(Decimal::ZERO);
        assert!(evaluate_tax(&record, &config).is_none());
    }

    #[test]
    fn test_tax_calculation_failure_is_critical() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-3", dec!(100), dec!(10), dec!(110)).with_tax_rate(dec!(-10));

        let finding = evaluate_tax(&record, &config).unwrap();
        assert_eq!(finding.severity, Severity::Critical);
        assert!(finding.outcome.is_failed());
    }

    #[test]
    fn test_total_uses_stated_tax() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-4", dec!(200), dec!(25), dec!(225)).with_tax_rate(dec!(10));

        assert!(evaluate_total(&record, &config).is_none());
    }

    #[test]
    fn test_total_mismatch_severity() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-5", dec!(100), dec!(10), dec!(104)).with_discount(dec!(5));

        // expected 105, found 104: ~0.95%
        let finding = evaluate_total(&record, &config).unwrap();
        assert_eq!(finding.outcome.calculated_value(), Some(dec!(105.00)));
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn test_discount_consistent() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-6", dec!(10000), dec!(0), dec!(8765.44)).with_discount(dec!(1234.56));

        assert!(evaluate_discount(&record, &config).is_none());
    }

    #[test]
    fn test_discount_consistent_on_large_amount() {
        let config = ValidationConfig::default();
        let record =
            InvoiceRecord::new("INV-6L", dec!(1000000), dec!(0), dec!(876543.22)).with_discount(dec!(123456.78));

        assert!(evaluate_discount(&record, &config).is_none());
    }

    #[test]
    fn test_discount_on_credit_note() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-7", dec!(-100), dec!(0), dec!(-105)).with_discount(dec!(5));

        assert!(evaluate_discount(&record, &config).is_none());
    }

    #[test]
    fn test_discount_exceeding_amount_is_recomputed() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-7B", dec!(50), dec!(0), dec!(-10)).with_discount(dec!(60));

        assert!(evaluate_discount(&record, &config).is_none());
    }

    #[test]
    fn test_discount_with_sub_cent_precision() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::tolerances(TolerancesUpdate {
            discount_calculation: Some(Decimal::ZERO),
            ..Default::default()
        }));
        let record = InvoiceRecord::new("INV-7C", dec!(100), dec!(0), dec!(87.655)).with_discount(dec!(12.345));

        // 12.345 rounds half up to 12.35
        let finding = evaluate_discount(&record, &config).unwrap();
        assert_eq!(finding.outcome.calculated_value(), Some(dec!(12.35)));
        assert_eq!(finding.outcome.discrepancy(), Some(dec!(0.005)));
    }

    #[test]
    fn test_discount_on_zero_amount_fails() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-8", Decimal::ZERO, dec!(0), dec!(-5)).with_discount(dec!(5));

        assert!(evaluate_discount(&record, &config).unwrap().outcome.is_failed());
    }

    #[test]
    fn test_line_items_are_high_and_indexed() {
        let config = ValidationConfig::default();
        let record = InvoiceRecord::new("INV-9", dec!(70), dec!(0), dec!(70)).with_line_items(vec![
            LineItem::new(dec!(2), dec!(10), dec!(20)),
            LineItem::new(dec!(5), dec!(10), dec!(50.02)),
        ]);

        let findings = evaluate_line_items(&record, &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, ValidationField::LineItem(1));
        assert_eq!(findings[0].severity, LINE_ITEM_SEVERITY);
        assert_eq!(findings[0].outcome.discrepancy(), Some(dec!(0.02)));
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::rules(RuleTogglesUpdate {
            validate_tax_calculation: Some(false),
            validate_total_calculation: Some(false),
            ..Default::default()
        }));
        let record = InvoiceRecord::new("INV-10", dec!(200), dec!(25), dec!(999)).with_tax_rate(dec!(10));

        assert!(evaluate_record(&record, &config).is_empty());
    }

    #[test]
    fn test_malformed_input_yields_general_finding() {
        let config = ValidationConfig::default();
        let findings = validate_input(&json!({}), &config);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, ValidationField::General);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].original_value, None);
    }
}
