//! Run outcomes that turn into a non-zero exit status.

use thiserror::Error;

/// A run that completed but did not meet its pass condition.
#[derive(Error, Debug)]
pub enum CliError {
    /// `--expect` was given and the valid count differs.
    #[error("expected {expected} valid receipts, got {valid}")]
    ExpectedCount {
        /// Requested valid count.
        expected: usize,
        /// Observed valid count.
        valid: usize,
    },
    /// At least one receipt failed verification.
    #[error("{invalid} of {total} receipts invalid")]
    InvalidReceipts {
        /// Failed records.
        invalid: usize,
        /// All records.
        total: usize,
    },
    /// At least one receipt could not be signed.
    #[error("{failed} of {total} receipts could not be signed")]
    SigningFailed {
        /// Failed records.
        failed: usize,
        /// All records.
        total: usize,
    },
}
