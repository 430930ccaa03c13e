//! Metrics collection for observability
//!
//! Each engine owns its own Prometheus registry, so several engines (or
//! tests) can coexist in one process.
//!
//! # Metrics
//!
//! - `invoice_validation_batches_total{outcome}` - Batches by outcome
//! - `invoice_validation_records_total` - Records validated in batches
//! - `invoice_validation_findings_total{severity}` - Findings by severity
//! - `invoice_validation_batch_duration_seconds` - Histogram of batch durations

use crate::{Result, Severity, ValidationResult};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;

/// Batch outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Completed normally
    Completed,
    /// Aborted
    Failed,
}

impl BatchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Completed => "completed",
            BatchOutcome::Failed => "failed",
        }
    }
}

/// Metrics collector
#[derive(Clone)]
pub struct EngineMetrics {
    /// Batches by outcome
    pub batches_total: IntCounterVec,

    /// Records validated in batches
    pub records_total: IntCounter,

    /// Findings by severity
    pub findings_total: IntCounterVec,

    /// Batch duration histogram
    pub batch_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl EngineMetrics {
    /// Create new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let batches_total = IntCounterVec::new(
            Opts::new("invoice_validation_batches_total", "Validation batches by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(batches_total.clone()))?;

        let records_total = IntCounter::new(
            "invoice_validation_records_total",
            "Records validated in batches",
        )?;
        registry.register(Box::new(records_total.clone()))?;

        let findings_total = IntCounterVec::new(
            Opts::new("invoice_validation_findings_total", "Findings by severity"),
            &["severity"],
        )?;
        registry.register(Box::new(findings_total.clone()))?;

        let batch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "invoice_validation_batch_duration_seconds",
                "Histogram of batch durations",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0]),
        )?;
        registry.register(Box::new(batch_duration.clone()))?;

        Ok(Self {
            batches_total,
            records_total,
            findings_total,
            batch_duration,
            registry,
        })
    }

    /// Count one record and its findings
    pub fn record_validated(&self, findings: &[ValidationResult]) {
        self.records_total.inc();
        for finding in findings {
            self.findings_total
                .with_label_values(&[finding.severity.as_str()])
                .inc();
        }
    }

    /// Count a finished batch
    pub fn batch_finished(&self, outcome: BatchOutcome, duration_ms: u64) {
        self.batches_total.with_label_values(&[outcome.as_str()]).inc();
        self.batch_duration.observe(duration_ms as f64 / 1000.0);
    }

    /// Findings counted for one tier
    pub fn findings(&self, severity: Severity) -> u64 {
        self.findings_total.with_label_values(&[severity.as_str()]).get()
    }

    /// Text exposition of all metrics
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Other(e.to_string()))
    }
}

impl fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("records_total", &self.records_total.get())
            .finish_non_exhaustive()
    }
}
