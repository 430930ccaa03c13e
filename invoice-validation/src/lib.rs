//! Invoice Validation Engine
//!
//! Recomputes tax, discount, line-item and total values of parsed invoice
//! records, flags discrepancies beyond a tolerance and classifies them by
//! severity.
//!
//! # Architecture
//!
//! 1. **Calculation**: pure decimal arithmetic with one rounding primitive
//! 2. **Rules**: per-field evaluators producing zero or one finding
//! 3. **Severity**: discrepancy percentage -> LOW / MEDIUM / HIGH / CRITICAL
//! 4. **Batch**: sequential loop with progress, cooperative yields and a
//!    running summary
//! 5. **Engine**: owns configuration and the latest results
//!
//! # Example
//!
//! ```no_run
//! use invoice_validation::{InvoiceRecord, ValidationConfig, ValidationEngine};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> invoice_validation::Result<()> {
//!     let mut engine = ValidationEngine::new(ValidationConfig::default())?;
//!
//!     let record = InvoiceRecord::new("INV-1", Decimal::from(200), Decimal::from(25), Decimal::from(225))
//!         .with_tax_rate(Decimal::from(10));
//!
//!     let summary = engine.validate_batch(&[record]).await?;
//!     println!("{} invalid, {} critical", summary.invalid_records, summary.critical_count);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod batch;
pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod metrics;
pub mod rules;
pub mod severity;
pub mod types;

// Re-exports
pub use calculation::{CalculationOptions, DiscountMode, RoundingMethod};
pub use config::{ConfigUpdate, ValidationConfig};
pub use engine::ValidationEngine;
pub use error::{Error, Result};
pub use input::RecordInput;
pub use severity::determine_severity;
pub use tokio_util::sync::CancellationToken;
pub use types::*;
