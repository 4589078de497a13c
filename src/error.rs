//! Error types for barcode detection

use thiserror::Error;

/// Failures that abort a whole decode call
///
/// A barcode that is simply not found is not an error; the result list is empty.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarcodeError {
    /// A `ScanConfig` field is out of range
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        /// Offending field name
        field: &'static str,
        /// What the field must satisfy
        reason: String,
    },

    /// Guard patterns or module bounds cannot drive detection
    #[error("invalid symbology parameters: {reason}")]
    InvalidSymbology {
        /// What is wrong with the parameters
        reason: String,
    },

    /// The time budget ran out before the scan finished
    #[error("decode timed out after {elapsed_ms} ms (budget {budget_ms} ms)")]
    Timeout {
        /// Time spent when the check fired
        elapsed_ms: u128,
        /// Configured budget
        budget_ms: u128,
    },
}

impl BarcodeError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        BarcodeError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this error is a deadline abort
    pub fn is_timeout(&self) -> bool {
        matches!(self, BarcodeError::Timeout { .. })
    }
}

/// Crate result alias
pub type Result<T> = std::result::Result<T, BarcodeError>;
