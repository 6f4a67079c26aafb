use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable per-record failure codes returned by batch operations.
///
/// Batch surfaces (ingest passes, batch translation) always report a success
/// list and a failure list carrying one of these, never an all-or-nothing
/// exception — unless fail-fast was explicitly requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    /// No mapping exists for the requested translation. A soft failure, not
    /// an error.
    NoMapping,
    /// The record failed structural validation before any lookup or write.
    ValidationFailed,
    /// Concurrent-write retries were exhausted for this record's key.
    Conflict,
    /// Unexpected infrastructure failure captured per-item in non-fail-fast
    /// batches.
    Internal,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCode::NoMapping => "NO_MAPPING",
            FailureCode::ValidationFailed => "VALIDATION_FAILED",
            FailureCode::Conflict => "CONFLICT",
            FailureCode::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}
