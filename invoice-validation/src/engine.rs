//! Validation engine
//!
//! Owns the configuration and the results of the most recent batch.

use crate::batch::{new_batch_id, BatchOrchestrator};
use crate::config::{ConfigUpdate, ValidationConfig};
use crate::input::RecordInput;
use crate::metrics::{BatchOutcome, EngineMetrics};
use crate::rules::validate_input;
use crate::{
    BatchState, FinancialImpact, Performance, Result, Severity, SeverityBreakdown,
    ValidationProgress, ValidationResult, ValidationStatistics, ValidationSummary,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Validation engine
#[derive(Debug)]
pub struct ValidationEngine {
    /// Configuration
    config: ValidationConfig,

    /// Findings of the current batch
    results: Vec<ValidationResult>,

    /// Summary of the current batch
    summary: Option<ValidationSummary>,

    /// Batch lifecycle
    state: BatchState,

    /// Metrics
    metrics: EngineMetrics,
}

impl ValidationEngine {
    /// Create new engine; the configuration is validated first
    pub fn new(config: ValidationConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            results: Vec::new(),
            summary: None,
            state: BatchState::Idle,
            metrics: EngineMetrics::new()?,
        })
    }

    /// Create new engine from defaults with `update` merged in
    pub fn with_update(update: &ConfigUpdate) -> Result<Self> {
        Self::new(ValidationConfig::default().merged(update))
    }

    /// Current configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Merge `update` into the configuration
    ///
    /// Invalid results are rejected and the configuration stays unchanged.
    pub fn update_config(&mut self, update: &ConfigUpdate) -> Result<()> {
        let config = self.config.merged(update);
        config.validate()?;
        self.config = config;
        info!("Validation configuration updated");
        Ok(())
    }

    /// Batch lifecycle state
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Metrics collector
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Validate one record without touching the stored results
    pub fn validate_record<R: RecordInput + ?Sized>(&self, record: &R) -> Vec<ValidationResult> {
        validate_input(record, &self.config)
    }

    /// Validate a batch, replacing the stored results and summary
    pub async fn validate_batch<R: RecordInput>(&mut self, records: &[R]) -> Result<ValidationSummary> {
        self.execute(records, None, &mut |_: &ValidationProgress| {}).await
    }

    /// [`validate_batch`](Self::validate_batch) with progress notifications
    pub async fn validate_batch_with_progress<R, F>(
        &mut self,
        records: &[R],
        mut on_progress: F,
    ) -> Result<ValidationSummary>
    where
        R: RecordInput,
        F: FnMut(&ValidationProgress),
    {
        self.execute(records, None, &mut on_progress).await
    }

    /// [`validate_batch_with_progress`](Self::validate_batch_with_progress)
    /// that stops with [`Error::Cancelled`](crate::Error::Cancelled) once
    /// `cancel` fires
    pub async fn validate_batch_cancellable<R, F>(
        &mut self,
        records: &[R],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<ValidationSummary>
    where
        R: RecordInput,
        F: FnMut(&ValidationProgress),
    {
        self.execute(records, Some(cancel), &mut on_progress).await
    }

    #[instrument(skip_all, fields(records = records.len()))]
    async fn execute<R, F>(
        &mut self,
        records: &[R],
        cancel: Option<&CancellationToken>,
        on_progress: &mut F,
    ) -> Result<ValidationSummary>
    where
        R: RecordInput,
        F: FnMut(&ValidationProgress),
    {
        self.results.clear();
        self.summary = None;
        self.state = BatchState::Validating;

        let mut summary = ValidationSummary::start(new_batch_id(), records.len());
        let orchestrator = BatchOrchestrator {
            config: &self.config,
            metrics: &self.metrics,
        };
        let outcome = orchestrator
            .run(records, &mut self.results, &mut summary, cancel, on_progress)
            .await;

        let batch_outcome = if outcome.is_ok() {
            BatchOutcome::Completed
        } else {
            BatchOutcome::Failed
        };
        self.metrics.batch_finished(batch_outcome, summary.processing_time_ms);
        self.state = match batch_outcome {
            BatchOutcome::Completed => BatchState::Completed,
            BatchOutcome::Failed => BatchState::Failed,
        };
        self.summary = Some(summary.clone());

        outcome.map(|()| summary)
    }

    /// Findings of the current batch
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Summary of the current batch
    pub fn summary(&self) -> Option<&ValidationSummary> {
        self.summary.as_ref()
    }

    /// Findings of one tier
    pub fn results_by_severity(&self, severity: Severity) -> Vec<&ValidationResult> {
        self.results.iter().filter(|r| r.severity == severity).collect()
    }

    /// Findings for one record
    pub fn results_by_record(&self, record_id: &str) -> Vec<&ValidationResult> {
        self.results.iter().filter(|r| r.record_id == record_id).collect()
    }

    /// Drop results and summary; configuration is kept
    pub fn clear_results(&mut self) {
        self.results.clear();
        self.summary = None;
        self.state = BatchState::Idle;
    }

    /// Dashboard view of the current summary
    pub fn statistics(&self) -> ValidationStatistics {
        let Some(summary) = &self.summary else {
            return ValidationStatistics::default();
        };

        let valid_percentage = if summary.total_records > 0 {
            summary.valid_records as f64 / summary.total_records as f64 * 100.0
        } else {
            0.0
        };

        let records_per_second = if summary.processing_time_ms > 0 {
            summary.processed_records() as f64 / (summary.processing_time_ms as f64 / 1000.0)
        } else {
            0.0
        };

        ValidationStatistics {
            batch_id: Some(summary.batch_id),
            total_records: summary.total_records,
            valid_records: summary.valid_records,
            invalid_records: summary.invalid_records,
            valid_percentage,
            total_discrepancies: summary.total_discrepancies,
            severity: SeverityBreakdown {
                critical: summary.critical_count,
                high: summary.high_severity_count,
                medium: summary.medium_severity_count,
                low: summary.low_severity_count,
            },
            financial_impact: FinancialImpact {
                total_discrepancy_amount: summary.total_discrepancy_amount,
                average_discrepancy_amount: summary.average_discrepancy_amount,
                max_discrepancy_amount: summary.max_discrepancy_amount,
            },
            performance: Performance {
                processing_time_ms: summary.processing_time_ms,
                records_per_second,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdsUpdate;
    use crate::{Error, InvoiceRecord, ProgressStatus, ValidationField};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn valid_record(id: &str) -> InvoiceRecord {
        InvoiceRecord::new(id, dec!(200), dec!(20), dec!(220)).with_tax_rate(dec!(10))
    }

    fn overtaxed_record(id: &str) -> InvoiceRecord {
        InvoiceRecord::new(id, dec!(200), dec!(25), dec!(225)).with_tax_rate(dec!(10))
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        let records = vec![valid_record("INV-1"), overtaxed_record("INV-2")];

        let summary = engine.validate_batch(&records).await.unwrap();

        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.valid_records, 1);
        assert_eq!(summary.invalid_records, 1);
        assert_eq!(summary.total_discrepancies, 1);
        assert_eq!(summary.critical_count, 1);
        assert_eq!(engine.state(), BatchState::Completed);

        let findings = engine.results_by_record("INV-2");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, ValidationField::TaxAmount);
        assert_eq!(findings[0].outcome.calculated_value(), Some(dec!(20.00)));
        assert_eq!(findings[0].outcome.discrepancy(), Some(dec!(5)));
        assert_eq!(findings[0].outcome.discrepancy_percentage(), Some(dec!(25)));
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_progress_sequence() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        let records: Vec<_> = (0..25).map(|i| valid_record(&format!("INV-{}", i))).collect();
        let mut events = Vec::new();

        engine
            .validate_batch_with_progress(&records, |p| events.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(events.len(), 26);
        assert!(events
            .windows(2)
            .all(|w| w[0].processed_records <= w[1].processed_records));
        assert_eq!(events[0].processed_records, 0);
        assert_eq!(events[0].current_record, 1);
        assert_eq!(events[0].status, ProgressStatus::Processing);

        let last = events.last().unwrap();
        assert_eq!(last.processed_records, 25);
        assert_eq!(last.progress_percentage, 100);
        assert_eq!(last.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn test_malformed_records_do_not_abort() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        let records = vec![
            json!({ "id": "A", "amount": 100, "taxRate": 10, "taxAmount": 10, "totalAmount": 110 }),
            json!({}),
            json!({ "id": "C", "amount": "oops", "taxAmount": 0, "totalAmount": 0 }),
        ];

        let summary = engine.validate_batch(&records).await.unwrap();

        assert_eq!(summary.valid_records, 1);
        assert_eq!(summary.invalid_records, 2);
        assert_eq!(summary.critical_count, 2);
        assert_eq!(summary.total_discrepancy_amount, dec!(0));
        assert_eq!(engine.results_by_record("unknown").len(), 1);
        assert_eq!(engine.results_by_record("C")[0].field, ValidationField::General);
    }

    #[tokio::test]
    async fn test_cancelled_batch_keeps_partial_results() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        let records: Vec<_> = (0..5).map(|i| overtaxed_record(&format!("INV-{}", i))).collect();
        let cancel = CancellationToken::new();
        let mut last_status = None;

        let result = engine
            .validate_batch_cancellable(&records, &cancel, |p| {
                if p.current_record == 3 {
                    cancel.cancel();
                }
                last_status = Some(p.status);
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled { processed: 3 })));
        assert_eq!(last_status, Some(ProgressStatus::Failed));
        assert_eq!(engine.state(), BatchState::Failed);

        let summary = engine.summary().unwrap();
        assert_eq!(summary.total_records, 5);
        assert_eq!(summary.processed_records(), 3);
        assert!(summary.validation_end_time.is_some());
        assert_eq!(engine.results().len(), 3);
    }

    #[tokio::test]
    async fn test_new_batch_replaces_results() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();

        let first = engine.validate_batch(&[overtaxed_record("INV-1")]).await.unwrap();
        let second = engine.validate_batch(&[valid_record("INV-2")]).await.unwrap();

        assert_ne!(first.batch_id, second.batch_id);
        assert!(engine.results().is_empty());
        assert_eq!(engine.summary().unwrap().batch_id, second.batch_id);
    }

    #[tokio::test]
    async fn test_read_accessors_are_idempotent() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        engine
            .validate_batch(&[overtaxed_record("INV-1"), valid_record("INV-2")])
            .await
            .unwrap();

        let first = engine.results().to_vec();
        let second = engine.results().to_vec();
        assert_eq!(first, second);
        assert_eq!(engine.statistics(), engine.statistics());
        assert_eq!(engine.results_by_severity(Severity::Critical).len(), 1);
        assert!(engine.results_by_severity(Severity::Low).is_empty());
    }

    #[tokio::test]
    async fn test_clear_results_keeps_config() {
        let update = ConfigUpdate::thresholds(ThresholdsUpdate {
            critical: Some(dec!(50)),
            ..Default::default()
        });
        let mut engine = ValidationEngine::with_update(&update).unwrap();
        engine.validate_batch(&[overtaxed_record("INV-1")]).await.unwrap();

        engine.clear_results();

        assert!(engine.results().is_empty());
        assert!(engine.summary().is_none());
        assert_eq!(engine.state(), BatchState::Idle);
        assert_eq!(engine.config().thresholds.critical, dec!(50));
        assert_eq!(engine.statistics(), ValidationStatistics::default());
    }

    #[test]
    fn test_update_config_merges_and_validates() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();

        engine
            .update_config(&ConfigUpdate::thresholds(ThresholdsUpdate {
                low: Some(dec!(2)),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(engine.config().thresholds.low, dec!(2));
        assert_eq!(engine.config().thresholds.medium, dec!(5));

        let rejected = engine.update_config(&ConfigUpdate::thresholds(ThresholdsUpdate {
            high: Some(dec!(1)),
            ..Default::default()
        }));
        assert!(rejected.is_err());
        assert_eq!(engine.config().thresholds.high, dec!(10));
    }

    #[test]
    fn test_validate_record_does_not_store() {
        let engine = ValidationEngine::new(ValidationConfig::default()).unwrap();

        let findings = engine.validate_record(&overtaxed_record("INV-1"));

        assert_eq!(findings.len(), 1);
        assert!(engine.results().is_empty());
        assert_eq!(engine.state(), BatchState::Idle);
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        let mut events = Vec::new();

        let summary = engine
            .validate_batch_with_progress(&Vec::<InvoiceRecord>::new(), |p| events.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(summary.total_records, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].progress_percentage, 100);
        assert_eq!(events[0].status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn test_statistics_and_metrics() {
        let mut engine = ValidationEngine::new(ValidationConfig::default()).unwrap();
        engine
            .validate_batch(&[overtaxed_record("INV-1"), valid_record("INV-2")])
            .await
            .unwrap();

        let stats = engine.statistics();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.valid_percentage, 50.0);
        assert_eq!(stats.severity.critical, 1);
        assert_eq!(stats.financial_impact.total_discrepancy_amount, dec!(5));
        assert_eq!(stats.financial_impact.max_discrepancy_amount, dec!(5));

        assert_eq!(engine.metrics().records_total.get(), 2);
        assert_eq!(engine.metrics().findings(Severity::Critical), 1);
    }
}
