// crates/result-grid-index/src/error.rs
// ============================================================================
// Module: Index Errors
// Description: Error taxonomy for index construction and reads.
// Purpose: Distinguish fabrication failures, aborts, and worker faults.
// Dependencies: result-grid-core, thiserror
// ============================================================================

use result_grid_core::IdentifierError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by index construction and read operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A fabricated test id collided with the reserved zero value.
    #[error(transparent)]
    InvalidTestId(#[from] IdentifierError),
    /// The per-request deadline passed before the scan completed.
    #[error("query aborted: deadline exceeded")]
    Aborted,
    /// A shard worker failed to report a result.
    #[error("shard worker failed: {0}")]
    Worker(String),
}
