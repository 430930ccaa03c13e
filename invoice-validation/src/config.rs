//! Configuration for the validation engine

use crate::calculation::{CalculationOptions, RoundingMethod};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Highest supported rounding precision
pub const MAX_PRECISION: u32 = 10;

/// Validation engine configuration
///
/// Every group deserializes with defaults, so a partial file or JSON object
/// only overrides the keys it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Which evaluators run
    pub rules: RuleToggles,

    /// Absolute slack per field
    pub tolerances: Tolerances,

    /// Severity cut points (percent)
    pub thresholds: SeverityThresholds,

    /// Rounding and batch pacing
    pub processing: ProcessingOptions,
}

/// Evaluator toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleToggles {
    /// Recompute tax from the tax rate
    pub validate_tax_calculation: bool,

    /// Check amount + tax - discount against the total
    pub validate_total_calculation: bool,

    /// Check discount self-consistency
    pub validate_discount_calculation: bool,

    /// Check quantity * unit price per line
    pub validate_line_item_totals: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            validate_tax_calculation: true,
            validate_total_calculation: true,
            validate_discount_calculation: true,
            validate_line_item_totals: true,
        }
    }
}

/// Discrepancies at or below these amounts are ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Tax amount
    pub tax_calculation: Decimal,

    /// Invoice total
    pub total_calculation: Decimal,

    /// Discount amount
    pub discount_calculation: Decimal,

    /// Line totals
    pub line_item_calculation: Decimal,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            tax_calculation: Decimal::new(1, 2),       // 0.01
            total_calculation: Decimal::new(1, 2),     // 0.01
            discount_calculation: Decimal::new(1, 2),  // 0.01
            line_item_calculation: Decimal::new(1, 2), // 0.01
        }
    }
}

/// Discrepancy-percentage cut points, strictly ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    /// Low
    pub low: Decimal,

    /// Medium
    pub medium: Decimal,

    /// High
    pub high: Decimal,

    /// Critical
    pub critical: Decimal,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            low: Decimal::ONE,
            medium: Decimal::from(5),
            high: Decimal::TEN,
            critical: Decimal::from(20),
        }
    }
}

/// Rounding and batch pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Decimal places for calculated amounts
    pub precision: u32,

    /// Rounding method for calculated amounts
    pub rounding: RoundingMethod,

    /// Records between cooperative yields
    pub yield_interval: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            precision: 2,
            rounding: RoundingMethod::HalfUp,
            yield_interval: 10,
        }
    }
}

/// Partial configuration; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    /// Evaluator toggles
    pub rules: Option<RuleTogglesUpdate>,

    /// Tolerances
    pub tolerances: Option<TolerancesUpdate>,

    /// Thresholds
    pub thresholds: Option<ThresholdsUpdate>,

    /// Processing options
    pub processing: Option<ProcessingUpdate>,
}

/// Partial [`RuleToggles`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct RuleTogglesUpdate {
    pub validate_tax_calculation: Option<bool>,
    pub validate_total_calculation: Option<bool>,
    pub validate_discount_calculation: Option<bool>,
    pub validate_line_item_totals: Option<bool>,
}

/// Partial [`Tolerances`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TolerancesUpdate {
    pub tax_calculation: Option<Decimal>,
    pub total_calculation: Option<Decimal>,
    pub discount_calculation: Option<Decimal>,
    pub line_item_calculation: Option<Decimal>,
}

/// Partial [`SeverityThresholds`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ThresholdsUpdate {
    pub low: Option<Decimal>,
    pub medium: Option<Decimal>,
    pub high: Option<Decimal>,
    pub critical: Option<Decimal>,
}

/// Partial [`ProcessingOptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ProcessingUpdate {
    pub precision: Option<u32>,
    pub rounding: Option<RoundingMethod>,
    pub yield_interval: Option<usize>,
}

fn assign<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl ConfigUpdate {
    /// Update touching only the rule toggles
    pub fn rules(rules: RuleTogglesUpdate) -> Self {
        Self {
            rules: Some(rules),
            ..Default::default()
        }
    }

    /// Update touching only the tolerances
    pub fn tolerances(tolerances: TolerancesUpdate) -> Self {
        Self {
            tolerances: Some(tolerances),
            ..Default::default()
        }
    }

    /// Update touching only the thresholds
    pub fn thresholds(thresholds: ThresholdsUpdate) -> Self {
        Self {
            thresholds: Some(thresholds),
            ..Default::default()
        }
    }

    /// Update touching only the processing options
    pub fn processing(processing: ProcessingUpdate) -> Self {
        Self {
            processing: Some(processing),
            ..Default::default()
        }
    }
}

impl ValidationConfig {
    /// Copy of `self` with `update` merged in, group by group
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        let mut config = self.clone();

        if let Some(rules) = &update.rules {
            assign(&mut config.rules.validate_tax_calculation, &rules.validate_tax_calculation);
            assign(&mut config.rules.validate_total_calculation, &rules.validate_total_calculation);
            assign(
                &mut config.rules.validate_discount_calculation,
                &rules.validate_discount_calculation,
            );
            assign(&mut config.rules.validate_line_item_totals, &rules.validate_line_item_totals);
        }

        if let Some(tolerances) = &update.tolerances {
            assign(&mut config.tolerances.tax_calculation, &tolerances.tax_calculation);
            assign(&mut config.tolerances.total_calculation, &tolerances.total_calculation);
            assign(&mut config.tolerances.discount_calculation, &tolerances.discount_calculation);
            assign(&mut config.tolerances.line_item_calculation, &tolerances.line_item_calculation);
        }

        if let Some(thresholds) = &update.thresholds {
            assign(&mut config.thresholds.low, &thresholds.low);
            assign(&mut config.thresholds.medium, &thresholds.medium);
            assign(&mut config.thresholds.high, &thresholds.high);
            assign(&mut config.thresholds.critical, &thresholds.critical);
        }

        if let Some(processing) = &update.processing {
            assign(&mut config.processing.precision, &processing.precision);
            assign(&mut config.processing.rounding, &processing.rounding);
            assign(&mut config.processing.yield_interval, &processing.yield_interval);
        }

        config
    }

    /// Check tolerance, threshold and processing invariants
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("tax_calculation", self.tolerances.tax_calculation),
            ("total_calculation", self.tolerances.total_calculation),
            ("discount_calculation", self.tolerances.discount_calculation),
            ("line_item_calculation", self.tolerances.line_item_calculation),
        ];
        for (name, value) in tolerances {
            if value < Decimal::ZERO {
                return Err(Error::InvalidConfig(format!(
                    "tolerance {} must not be negative (got {})",
                    name, value
                )));
            }
        }

        let t = &self.thresholds;
        if !(t.low < t.medium && t.medium < t.high && t.high < t.critical) {
            return Err(Error::InvalidConfig(format!(
                "thresholds must be strictly ascending (low={}, medium={}, high={}, critical={})",
                t.low, t.medium, t.high, t.critical
            )));
        }

        if self.processing.precision > MAX_PRECISION {
            return Err(Error::InvalidConfig(format!(
                "precision {} exceeds maximum {}",
                self.processing.precision, MAX_PRECISION
            )));
        }

        if self.processing.yield_interval == 0 {
            return Err(Error::InvalidConfig("yield_interval must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Options passed to the calculation library
    pub fn calculation_options(&self) -> CalculationOptions {
        CalculationOptions {
            precision: self.processing.precision,
            rounding: self.processing.rounding,
        }
    }

    /// Load from a TOML file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ValidationConfig = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ValidationConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `INVOICE_VALIDATION_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_decimal("INVOICE_VALIDATION_TAX_TOLERANCE")? {
            self.tolerances.tax_calculation = value;
        }

        if let Some(value) = env_decimal("INVOICE_VALIDATION_TOTAL_TOLERANCE")? {
            self.tolerances.total_calculation = value;
        }

        if let Some(value) = env_decimal("INVOICE_VALIDATION_DISCOUNT_TOLERANCE")? {
            self.tolerances.discount_calculation = value;
        }

        if let Some(value) = env_decimal("INVOICE_VALIDATION_LINE_ITEM_TOLERANCE")? {
            self.tolerances.line_item_calculation = value;
        }

        if let Ok(value) = std::env::var("INVOICE_VALIDATION_PRECISION") {
            self.processing.precision = value.parse().map_err(|e| {
                Error::InvalidConfig(format!("INVOICE_VALIDATION_PRECISION={}: {}", value, e))
            })?;
        }

        if let Ok(value) = std::env::var("INVOICE_VALIDATION_YIELD_INTERVAL") {
            self.processing.yield_interval = value.parse().map_err(|e| {
                Error::InvalidConfig(format!("INVOICE_VALIDATION_YIELD_INTERVAL={}: {}", value, e))
            })?;
        }

        self.validate()
    }
}

fn env_decimal(name: &str) -> Result<Option<Decimal>> {
    match std::env::var(name) {
        Ok(value) => Decimal::from_str(value.trim())
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("{}={}: {}", name, value, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert!(config.rules.validate_tax_calculation);
        assert_eq!(config.tolerances.tax_calculation, dec!(0.01));
        assert_eq!(config.thresholds.critical, dec!(20));
        assert_eq!(config.processing.yield_interval, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_update_preserves_other_thresholds() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::thresholds(ThresholdsUpdate {
            low: Some(dec!(2)),
            ..Default::default()
        }));

        assert_eq!(config.thresholds.low, dec!(2));
        assert_eq!(config.thresholds.medium, dec!(5));
        assert_eq!(config.thresholds.high, dec!(10));
        assert_eq!(config.thresholds.critical, dec!(20));
        assert_eq!(config.tolerances, Tolerances::default());
    }

    #[test]
    fn test_partial_json_update() {
        let update: ConfigUpdate = serde_json::from_value(serde_json::json!({
            "rules": { "validate_line_item_totals": false },
            "tolerances": { "tax_calculation": "1.0" }
        }))
        .unwrap();

        let config = ValidationConfig::default().merged(&update);
        assert!(!config.rules.validate_line_item_totals);
        assert!(config.rules.validate_tax_calculation);
        assert_eq!(config.tolerances.tax_calculation, dec!(1.0));
        assert_eq!(config.tolerances.total_calculation, dec!(0.01));
    }

    #[test]
    fn test_non_ascending_thresholds_rejected() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::thresholds(ThresholdsUpdate {
            medium: Some(dec!(15)),
            ..Default::default()
        }));

        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::tolerances(TolerancesUpdate {
            total_calculation: Some(dec!(-0.5)),
            ..Default::default()
        }));

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_yield_interval_rejected() {
        let config = ValidationConfig::default().merged(&ConfigUpdate::processing(ProcessingUpdate {
            yield_interval: Some(0),
            ..Default::default()
        }));

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[thresholds]
critical = "30"

[processing]
rounding = "half_even"
"#
        )
        .unwrap();

        let config = ValidationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.thresholds.critical, dec!(30));
        assert_eq!(config.thresholds.high, dec!(10));
        assert_eq!(config.processing.rounding, RoundingMethod::HalfEven);
        assert_eq!(config.processing.precision, 2);
    }
}
