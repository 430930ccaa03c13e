//! Core types for the validation engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Invoice record as handed over by the file-parsing layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// Record identifier (string or numeric in the source data)
    #[serde(deserialize_with = "deserialize_record_id")]
    pub id: String,

    /// Invoice number
    #[serde(default)]
    pub invoice_number: String,

    /// Customer name
    #[serde(default)]
    pub customer_name: String,

    /// Pre-tax base amount
    pub amount: Decimal,

    /// Tax rate in percent
    #[serde(default)]
    pub tax_rate: Option<Decimal>,

    /// Stated tax amount
    pub tax_amount: Decimal,

    /// Stated discount amount
    #[serde(default)]
    pub discount_amount: Decimal,

    /// Stated invoice total
    pub total_amount: Decimal,

    /// Line items, in source order
    #[serde(default)]
    pub line_items: Vec<LineItem>,

    /// Invoice date as it appeared in the source file
    #[serde(default)]
    pub date: String,
}

impl InvoiceRecord {
    /// Create a record with no tax rate, discount or line items
    pub fn new(
        id: impl Into<String>,
        amount: Decimal,
        tax_amount: Decimal,
        total_amount: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            invoice_number: String::new(),
            customer_name: String::new(),
            amount,
            tax_rate: None,
            tax_amount,
            discount_amount: Decimal::ZERO,
            total_amount,
            line_items: Vec::new(),
            date: String::new(),
        }
    }

    /// Set tax rate (percent)
    pub fn with_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = Some(tax_rate);
        self
    }

    /// Set discount amount
    pub fn with_discount(mut self, discount_amount: Decimal) -> Self {
        self.discount_amount = discount_amount;
        self
    }

    /// Set line items
    pub fn with_line_items(mut self, line_items: Vec<LineItem>) -> Self {
        self.line_items = line_items;
        self
    }

    /// Set invoice number and customer
    pub fn with_invoice(mut self, invoice_number: impl Into<String>, customer_name: impl Into<String>) -> Self {
        self.invoice_number = invoice_number.into();
        self.customer_name = customer_name.into();
        self
    }
}

fn deserialize_record_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// Single invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Quantity
    pub quantity: Decimal,

    /// Unit price
    pub unit_price: Decimal,

    /// Stated line total
    pub line_total: Decimal,
}

impl LineItem {
    /// Create new line item
    pub fn new(quantity: Decimal, unit_price: Decimal, line_total: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
            line_total,
        }
    }
}

/// Severity tier, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl Severity {
    /// All tiers, least severe first
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field a finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationField {
    /// Tax amount
    TaxAmount,
    /// Invoice total
    TotalAmount,
    /// Discount amount
    DiscountAmount,
    /// Line item total, by index
    LineItem(usize),
    /// Whole record (shape failures)
    General,
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationField::TaxAmount => f.write_str("tax_amount"),
            ValidationField::TotalAmount => f.write_str("total_amount"),
            ValidationField::DiscountAmount => f.write_str("discount_amount"),
            ValidationField::LineItem(index) => write!(f, "line_item[{}]", index),
            ValidationField::General => f.write_str("general"),
        }
    }
}

/// What the engine could establish for a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FindingOutcome {
    /// Expected value recomputed; stated value differs beyond tolerance
    #[serde(rename_all = "camelCase")]
    Calculated {
        /// Recomputed expected value
        calculated_value: Decimal,
        /// Absolute difference
        discrepancy: Decimal,
        /// Difference relative to the expected value, in percent
        discrepancy_percentage: Decimal,
    },
    /// Expected value could not be computed
    Failed {
        /// Why the calculation failed
        reason: String,
    },
}

impl FindingOutcome {
    /// Numeric discrepancy, if one was computed
    pub fn discrepancy(&self) -> Option<Decimal> {
        match self {
            FindingOutcome::Calculated { discrepancy, .. } => Some(*discrepancy),
            FindingOutcome::Failed { .. } => None,
        }
    }

    /// Recomputed value, if one was computed
    pub fn calculated_value(&self) -> Option<Decimal> {
        match self {
            FindingOutcome::Calculated { calculated_value, .. } => Some(*calculated_value),
            FindingOutcome::Failed { .. } => None,
        }
    }

    /// Discrepancy percentage, if one was computed
    pub fn discrepancy_percentage(&self) -> Option<Decimal> {
        match self {
            FindingOutcome::Calculated {
                discrepancy_percentage,
                ..
            } => Some(*discrepancy_percentage),
            FindingOutcome::Failed { .. } => None,
        }
    }

    /// True when the calculation failed
    pub fn is_failed(&self) -> bool {
        matches!(self, FindingOutcome::Failed { .. })
    }
}

/// One detected discrepancy for one field of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Record the finding belongs to
    pub record_id: String,

    /// Field checked
    pub field: ValidationField,

    /// Value stated on the record (absent for shape failures)
    pub original_value: Option<Decimal>,

    /// Calculated discrepancy or calculation failure
    pub outcome: FindingOutcome,

    /// Severity tier
    pub severity: Severity,

    /// Human-readable description
    pub message: String,
}

impl ValidationResult {
    /// Finding for a field whose expected value could not be computed
    pub fn calculation_failed(
        record_id: impl Into<String>,
        field: ValidationField,
        original_value: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            record_id: record_id.into(),
            field,
            original_value: Some(original_value),
            message: format!("Calculation failed for {}: {}", field, reason),
            outcome: FindingOutcome::Failed { reason },
            severity: Severity::Critical,
        }
    }

    /// Finding for a record that could not be read at all
    pub fn malformed_record(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            record_id: record_id.into(),
            field: ValidationField::General,
            original_value: None,
            message: format!("Record could not be validated: {}", reason),
            outcome: FindingOutcome::Failed { reason },
            severity: Severity::Critical,
        }
    }
}

/// Lifecycle of the engine's current batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// No batch has run since construction or the last clear
    Idle,
    /// Batch in progress
    Validating,
    /// Last batch completed
    Completed,
    /// Last batch aborted
    Failed,
}

/// Aggregate statistics for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// Batch identifier
    pub batch_id: Uuid,

    /// Batch start
    pub validation_start_time: DateTime<Utc>,

    /// Batch end (set on completion or failure)
    pub validation_end_time: Option<DateTime<Utc>>,

    /// Wall-clock processing time
    pub processing_time_ms: u64,

    /// Records submitted
    pub total_records: usize,

    /// Records without findings
    pub valid_records: usize,

    /// Records with at least one finding
    pub invalid_records: usize,

    /// Findings across all records
    pub total_discrepancies: usize,

    /// CRITICAL findings
    pub critical_count: usize,

    /// HIGH findings
    pub high_severity_count: usize,

    /// MEDIUM findings
    pub medium_severity_count: usize,

    /// LOW findings
    pub low_severity_count: usize,

    /// Sum of numeric discrepancies
    pub total_discrepancy_amount: Decimal,

    /// Sum divided by finding count
    pub average_discrepancy_amount: Decimal,

    /// Largest numeric discrepancy
    pub max_discrepancy_amount: Decimal,
}

impl ValidationSummary {
    /// Empty summary for a batch starting now
    pub fn start(batch_id: Uuid, total_records: usize) -> Self {
        Self {
            batch_id,
            validation_start_time: Utc::now(),
            validation_end_time: None,
            processing_time_ms: 0,
            total_records,
            valid_records: 0,
            invalid_records: 0,
            total_discrepancies: 0,
            critical_count: 0,
            high_severity_count: 0,
            medium_severity_count: 0,
            low_severity_count: 0,
            total_discrepancy_amount: Decimal::ZERO,
            average_discrepancy_amount: Decimal::ZERO,
            max_discrepancy_amount: Decimal::ZERO,
        }
    }

    /// Records processed so far
    pub fn processed_records(&self) -> usize {
        self.valid_records + self.invalid_records
    }

    /// Finding count for one tier
    pub fn severity_count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low_severity_count,
            Severity::Medium => self.medium_severity_count,
            Severity::High => self.high_severity_count,
            Severity::Critical => self.critical_count,
        }
    }
}

/// Progress status reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Batch running
    Processing,
    /// Batch completed
    Completed,
    /// Batch aborted
    Failed,
}

/// Progress notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProgress {
    /// Batch identifier
    pub batch_id: Uuid,

    /// Records in the batch
    pub total_records: usize,

    /// Records fully processed
    pub processed_records: usize,

    /// 1-based position of the record being processed
    pub current_record: usize,

    /// Status
    pub status: ProgressStatus,

    /// Completion percentage (0-100)
    pub progress_percentage: u8,

    /// Description of the current step
    pub current_operation: String,
}

/// Finding counts per tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBreakdown {
    /// CRITICAL
    pub critical: usize,
    /// HIGH
    pub high: usize,
    /// MEDIUM
    pub medium: usize,
    /// LOW
    pub low: usize,
}

/// Monetary impact of the findings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialImpact {
    /// Sum of numeric discrepancies
    pub total_discrepancy_amount: Decimal,
    /// Average discrepancy per finding
    pub average_discrepancy_amount: Decimal,
    /// Largest discrepancy
    pub max_discrepancy_amount: Decimal,
}

/// Throughput of the last batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Processing time
    pub processing_time_ms: u64,
    /// Records per second (0 when no time elapsed)
    pub records_per_second: f64,
}

/// Dashboard view derived from the current summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatistics {
    /// Batch the statistics describe
    pub batch_id: Option<Uuid>,
    /// Records submitted
    pub total_records: usize,
    /// Valid records
    pub valid_records: usize,
    /// Invalid records
    pub invalid_records: usize,
    /// Share of valid records, in percent
    pub valid_percentage: f64,
    /// Findings across all records
    pub total_discrepancies: usize,
    /// Findings per tier
    pub severity: SeverityBreakdown,
    /// Monetary impact
    pub financial_impact: FinancialImpact,
    /// Throughput
    pub performance: Performance,
}
