// crates/result-grid-store/src/run_store.rs
// ============================================================================
// Module: Run Store Contract
// Description: Trait for the external run-metadata store.
// Purpose: Capture exactly the operations the grid consumes.
// Dependencies: async-trait, result-grid-core, thiserror
// ============================================================================

//! ## Overview
//! The metadata store is an external collaborator; the grid needs two
//! operations from it: fetch one run record by id, and list the most recent
//! records by creation time. Everything else about the store is out of
//! scope, so the trait stays that small.

use async_trait::async_trait;
use result_grid_core::RunId;
use result_grid_core::TestRun;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by run-store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store holds no record for the run id.
    #[error("run {0} not found")]
    RunNotFound(RunId),
    /// The store endpoint violates the outbound host policy.
    #[error("run store endpoint refused: {0}")]
    Policy(String),
    /// The store backend failed or answered with an unexpected status.
    #[error("run store backend error: {0}")]
    Backend(String),
    /// The store's response payload failed to decode.
    #[error("run store response invalid: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Run Store
// ============================================================================

/// The consumed contract of the external run-metadata store.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Fetches the record for one run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RunNotFound`] when the store has no record and
    /// [`StoreError::Backend`]/[`StoreError::Decode`] on transport or
    /// payload failures.
    async fn get_run(&self, id: RunId) -> Result<TestRun, StoreError>;

    /// Lists up to `limit` records ordered by creation time, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`]/[`StoreError::Decode`] on transport
    /// or payload failures.
    async fn recent_runs(&self, limit: usize) -> Result<Vec<TestRun>, StoreError>;
}
