//! Worker message envelope
//!
//! Every message is a JSON object carrying a `type` discriminator:
//!
//! ```text
//! -> {"type":"validate","data":{"records":[...]}}
//! <- {"type":"progress","data":{...}}        (one per record, then completion)
//! <- {"type":"complete","data":{...summary}}
//! ```

use invoice_validation::{
    ConfigUpdate, ValidationConfig, ValidationProgress, ValidationResult, ValidationStatistics,
    ValidationSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Records of a batch request; kept as raw JSON so shape failures become findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    /// Records in batch order
    pub records: Vec<Value>,
}

/// Single-record request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Record to validate
    pub record: Value,
}

/// Inbound request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Validate a batch, replacing stored results
    Validate {
        /// Batch records
        data: BatchPayload,
    },

    /// Validate one record without storing results
    ValidateRecord {
        /// Record
        data: RecordPayload,
    },

    /// Merge a partial configuration
    UpdateConfig {
        /// Groups to merge
        data: ConfigUpdate,
    },

    /// Statistics for the current batch
    Statistics,

    /// Prometheus text exposition
    Metrics,

    /// Drop stored results
    Clear,
}

impl WorkerRequest {
    /// Discriminator as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerRequest::Validate { .. } => "validate",
            WorkerRequest::ValidateRecord { .. } => "validate_record",
            WorkerRequest::UpdateConfig { .. } => "update_config",
            WorkerRequest::Statistics => "statistics",
            WorkerRequest::Metrics => "metrics",
            WorkerRequest::Clear => "clear",
        }
    }
}

/// Outbound response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum WorkerResponse {
    /// Batch progress notification
    Progress { data: ValidationProgress },

    /// Batch finished; carries the summary
    Complete { data: ValidationSummary },

    /// Findings of a single-record request
    RecordResults { data: Vec<ValidationResult> },

    /// Statistics snapshot
    Statistics { data: ValidationStatistics },

    /// Metrics in Prometheus text format
    Metrics { data: String },

    /// Configuration after a successful merge
    ConfigUpdated { data: ValidationConfig },

    /// Results were cleared
    Cleared,

    /// Request failed
    Error { error: String },
}

impl WorkerResponse {
    /// Error response from anything printable
    pub fn error(err: impl std::fmt::Display) -> Self {
        WorkerResponse::Error {
            error: err.to_string(),
        }
    }

    /// Whether this response ends the exchange for its request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerResponse::Progress { .. })
    }
}
