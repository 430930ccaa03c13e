//! Batch orchestration
//!
//! Runs the rule evaluators over a slice of records, folding each record's
//! findings into a running [`ValidationSummary`].
//!
//! # Flow
//!
//! ```text
//! for each record i:
//!   cancelled?            -> abort (Error::Cancelled)
//!   i % yield_interval    -> tokio::task::yield_now()
//!   progress(i)           -> caller callback, status = processing
//!   validate_input        -> findings (shape failures become findings)
//!   summary.absorb        -> counters, discrepancy sum and max
//! finalize                -> end time, duration, average
//! progress(done | failed)
//! ```

use crate::config::ValidationConfig;
use crate::input::RecordInput;
use crate::metrics::EngineMetrics;
use crate::rules::validate_input;
use crate::{
    Error, ProgressStatus, Result, Severity, ValidationProgress, ValidationResult,
    ValidationSummary,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Round-half-up percentage of `processed` over `total`; an empty batch is 100%
pub fn progress_percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percentage = (processed.min(total) as u128 * 200 + total as u128) / (total as u128 * 2);
    percentage as u8
}

/// Fresh batch identifier (UUIDv7: millisecond timestamp plus random bits)
pub fn new_batch_id() -> Uuid {
    Uuid::now_v7()
}

impl ValidationSummary {
    /// Fold one record's findings into the running totals
    pub fn absorb(&mut self, findings: &[ValidationResult]) -> Result<()> {
        if findings.is_empty() {
            self.valid_records += 1;
            return Ok(());
        }

        self.invalid_records += 1;
        self.total_discrepancies += findings.len();

        for finding in findings {
            match finding.severity {
                Severity::Critical => self.critical_count += 1,
                Severity::High => self.high_severity_count += 1,
                Severity::Medium => self.medium_severity_count += 1,
                Severity::Low => self.low_severity_count += 1,
            }

            if let Some(discrepancy) = finding.outcome.discrepancy() {
                self.total_discrepancy_amount = self
                    .total_discrepancy_amount
                    .checked_add(discrepancy)
                    .ok_or_else(|| {
                        Error::Aggregation(format!(
                            "discrepancy total overflowed at record {}",
                            finding.record_id
                        ))
                    })?;
                self.max_discrepancy_amount = self.max_discrepancy_amount.max(discrepancy);
            }
        }

        Ok(())
    }

    /// Set end time, duration and average
    pub fn finalize(&mut self, end: DateTime<Utc>) {
        self.validation_end_time = Some(end);
        self.processing_time_ms = (end - self.validation_start_time).num_milliseconds().max(0) as u64;

        if self.total_discrepancies > 0 {
            self.average_discrepancy_amount = self
                .total_discrepancy_amount
                .checked_div(Decimal::from(self.total_discrepancies))
                .unwrap_or(Decimal::ZERO);
        }
    }
}

/// Emits progress notifications for one batch
struct ProgressReporter<'a, F> {
    batch_id: Uuid,
    total_records: usize,
    on_progress: &'a mut F,
}

impl<F> ProgressReporter<'_, F>
where
    F: FnMut(&ValidationProgress),
{
    fn emit(&mut self, processed: usize, current: usize, status: ProgressStatus, operation: String) {
        let progress = ValidationProgress {
            batch_id: self.batch_id,
            total_records: self.total_records,
            processed_records: processed,
            current_record: current,
            status,
            progress_percentage: progress_percentage(processed, self.total_records),
            current_operation: operation,
        };
        (self.on_progress)(&progress);
    }

    fn processing(&mut self, index: usize, record_id: &str) {
        self.emit(
            index,
            index + 1,
            ProgressStatus::Processing,
            format!("Validating record {}", record_id),
        );
    }

    fn completed(&mut self) {
        let total = self.total_records;
        self.emit(total, total, ProgressStatus::Completed, "Validation complete".to_string());
    }

    fn failed(&mut self, processed: usize, error: &Error) {
        self.emit(
            processed,
            processed,
            ProgressStatus::Failed,
            format!("Validation failed: {}", error),
        );
    }
}

/// Drives one batch over the engine's configuration
pub(crate) struct BatchOrchestrator<'a> {
    pub(crate) config: &'a ValidationConfig,
    pub(crate) metrics: &'a EngineMetrics,
}

impl BatchOrchestrator<'_> {
    /// Validate `records`, appending findings to `results` and totals to `summary`
    ///
    /// On error the summary is still finalized and a `failed` notification is
    /// emitted; whatever was accumulated stays in `results` and `summary`.
    pub(crate) async fn run<R, F>(
        &self,
        records: &[R],
        results: &mut Vec<ValidationResult>,
        summary: &mut ValidationSummary,
        cancel: Option<&CancellationToken>,
        on_progress: &mut F,
    ) -> Result<()>
    where
        R: RecordInput,
        F: FnMut(&ValidationProgress),
    {
        let mut reporter = ProgressReporter {
            batch_id: summary.batch_id,
            total_records: records.len(),
            on_progress,
        };

        info!(
            batch_id = %summary.batch_id,
            total_records = records.len(),
            "Starting validation batch"
        );

        let outcome = self.process(records, results, summary, cancel, &mut reporter).await;
        summary.finalize(Utc::now());

        match outcome {
            Ok(()) => {
                reporter.completed();
                info!(
                    batch_id = %summary.batch_id,
                    valid = summary.valid_records,
                    invalid = summary.invalid_records,
                    discrepancies = summary.total_discrepancies,
                    critical = summary.critical_count,
                    processing_time_ms = summary.processing_time_ms,
                    "Validation batch complete"
                );
                Ok(())
            }
            Err(e) => {
                reporter.failed(summary.processed_records(), &e);
                warn!(
                    batch_id = %summary.batch_id,
                    processed = summary.processed_records(),
                    total_records = summary.total_records,
                    error = %e,
                    "Validation batch failed"
                );
                Err(e)
            }
        }
    }

    async fn process<R, F>(
        &self,
        records: &[R],
        results: &mut Vec<ValidationResult>,
        summary: &mut ValidationSummary,
        cancel: Option<&CancellationToken>,
        reporter: &mut ProgressReporter<'_, F>,
    ) -> Result<()>
    where
        R: RecordInput,
        F: FnMut(&ValidationProgress),
    {
        let yield_interval = self.config.processing.yield_interval.max(1);

        for (index, input) in records.iter().enumerate() {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(Error::Cancelled { processed: index });
            }

            if index > 0 && index % yield_interval == 0 {
                debug!(batch_id = %summary.batch_id, index, "Yielding to scheduler");
                tokio::task::yield_now().await;
            }

            let record_id = input.record_id();
            reporter.processing(index, &record_id);

            let findings = validate_input(input, self.config);
            self.metrics.record_validated(&findings);
            summary.absorb(&findings)?;
            results.extend(findings);
        }

        Ok(())
    }
}
