// crates/result-grid-index/src/shard.rs
// ============================================================================
// Module: Index Shard
// Description: One partition of the index, independently scannable.
// Purpose: Pair a tests table with a results table and run bound scans.
// Dependencies: crate::{deadline, error, filter, tables}
// ============================================================================

//! ## Overview
//! A shard owns the tests and results for every id with `id mod N` equal to
//! its position. Scans bind the filter once, then iterate every test id in
//! the shard, rechecking the request deadline between chunks so an expired
//! request aborts instead of emitting a partial result.

use result_grid_core::ResultId;
use result_grid_core::RunId;
use result_grid_core::TestId;

use crate::deadline::DEADLINE_CHECK_INTERVAL;
use crate::deadline::Deadline;
use crate::error::IndexError;
use crate::filter::FilterSpec;
use crate::tables::Results;
use crate::tables::Tests;

// ============================================================================
// SECTION: Shard
// ============================================================================

/// One partition of the index.
#[derive(Debug, Clone, Default)]
pub struct Shard {
    /// Test names belonging to this shard.
    tests: Tests,
    /// Result facts belonging to this shard.
    results: Results,
}

impl Shard {
    /// Creates an empty shard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shard's tests table.
    #[must_use]
    pub const fn tests(&self) -> &Tests {
        &self.tests
    }

    /// The shard's results table.
    #[must_use]
    pub const fn results(&self) -> &Results {
        &self.results
    }

    /// Records one fact: the stored string for the id plus its result in the
    /// given run.
    pub fn add_fact(&mut self, id: TestId, stored: String, run: RunId, result: ResultId) {
        self.tests.add(id, stored);
        self.results.add(run, id, result);
    }

    /// Scans every test id in the shard, retaining those the filter accepts.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Aborted`] when the deadline passes mid-scan.
    pub fn execute(&self, spec: &FilterSpec, deadline: Deadline) -> Result<Vec<TestId>, IndexError> {
        let bound = spec.bind(self);
        let mut matched = Vec::new();
        for (scanned, id) in self.tests.ids().enumerate() {
            if scanned % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
                return Err(IndexError::Aborted);
            }
            if bound.eval(id) {
                matched.push(id);
            }
        }
        Ok(matched)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use std::time::Duration;

    use result_grid_core::TestStatus;

    use super::*;

    #[test]
    fn execute_retains_matching_ids() {
        let mut shard = Shard::new();
        let (a, stored_a) = TestId::fabricate("/dom/a.html", None).unwrap();
        let (b, stored_b) = TestId::fabricate("/css/b.html", None).unwrap();
        shard.add_fact(a, stored_a, RunId(1), TestStatus::Pass.as_result_id());
        shard.add_fact(b, stored_b, RunId(1), TestStatus::Fail.as_result_id());

        let matched = shard.execute(&FilterSpec::name("/dom/"), Deadline::none()).unwrap();
        assert_eq!(matched, vec![a]);
    }

    #[test]
    fn execute_aborts_on_expired_deadline() {
        let mut shard = Shard::new();
        let (a, stored) = TestId::fabricate("/dom/a.html", None).unwrap();
        shard.add_fact(a, stored, RunId(1), TestStatus::Pass.as_result_id());

        let expired = Deadline::after(Duration::ZERO);
        assert_eq!(shard.execute(&FilterSpec::name("a"), expired), Err(IndexError::Aborted));
    }
}
