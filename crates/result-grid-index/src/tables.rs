// crates/result-grid-index/src/tables.rs
// ============================================================================
// Module: Shard Tables
// Description: Per-shard test-name and result lookup tables.
// Purpose: Store id → name and run → (test → result) facts for one shard.
// Dependencies: result-grid-core
// ============================================================================

//! ## Overview
//! Each shard owns one `Tests` table (id → stored string, where the stored
//! string may carry a NUL-separated subtest) and one `Results` table
//! (run → test → result). Both are plain hash maps cloned wholesale during
//! copy-on-write ingest.

use std::collections::HashMap;

use result_grid_core::ResultId;
use result_grid_core::RunId;
use result_grid_core::TestId;
use result_grid_core::display_name;

// ============================================================================
// SECTION: Tests Table
// ============================================================================

/// Mapping from test id to its full stored string.
#[derive(Debug, Clone, Default)]
pub struct Tests {
    /// Stored strings keyed by test id.
    by_id: HashMap<TestId, String>,
}

impl Tests {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a stored string for an id. Re-adding an id overwrites, which
    /// is a no-op for deterministic fingerprints.
    pub fn add(&mut self, id: TestId, stored: String) {
        self.by_id.insert(id, stored);
    }

    /// Returns the full stored string for an id, including any subtest part.
    #[must_use]
    pub fn stored(&self, id: TestId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Returns the display name for an id (the stored string up to the
    /// subtest separator).
    #[must_use]
    pub fn name(&self, id: TestId) -> Option<&str> {
        self.stored(id).map(display_name)
    }

    /// Iterates every test id in the table, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = TestId> + '_ {
        self.by_id.keys().copied()
    }

    /// Number of tests in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true when the table holds no tests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ============================================================================
// SECTION: Results Table
// ============================================================================

/// Mapping from run id to that run's (test → result) facts.
#[derive(Debug, Clone, Default)]
pub struct Results {
    /// Result columns keyed by run id.
    by_run_test: HashMap<RunId, HashMap<TestId, ResultId>>,
}

impl Results {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one (run, test) → result fact.
    pub fn add(&mut self, run: RunId, id: TestId, result: ResultId) {
        self.by_run_test.entry(run).or_default().insert(id, result);
    }

    /// Returns the result for (run, test), or `UNKNOWN` when the fact is
    /// absent.
    #[must_use]
    pub fn get(&self, run: RunId, id: TestId) -> ResultId {
        self.by_run_test
            .get(&run)
            .and_then(|column| column.get(&id))
            .copied()
            .unwrap_or(ResultId::UNKNOWN)
    }

    /// Returns the whole result column for a run, when the shard has seen it.
    #[must_use]
    pub fn run_column(&self, run: RunId) -> Option<&HashMap<TestId, ResultId>> {
        self.by_run_test.get(&run)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use result_grid_core::TestStatus;

    use super::*;

    fn id_for(name: &str) -> TestId {
        TestId::fabricate(name, None).unwrap().0
    }

    #[test]
    fn name_splits_off_subtest() {
        let mut tests = Tests::new();
        let (id, stored) = TestId::fabricate("/dom/a.html", Some("sub")).unwrap();
        tests.add(id, stored);
        assert_eq!(tests.name(id), Some("/dom/a.html"));
        assert_eq!(tests.stored(id), Some("/dom/a.html\0sub"));
    }

    #[test]
    fn absent_fact_reads_unknown() {
        let mut results = Results::new();
        let a = id_for("/dom/a.html");
        let b = id_for("/dom/b.html");
        results.add(RunId(1), a, TestStatus::Pass.as_result_id());
        assert_eq!(results.get(RunId(1), a), TestStatus::Pass.as_result_id());
        assert_eq!(results.get(RunId(1), b), ResultId::UNKNOWN);
        assert_eq!(results.get(RunId(2), a), ResultId::UNKNOWN);
    }

    #[test]
    fn run_column_is_absent_for_unseen_runs() {
        let results = Results::new();
        assert!(results.run_column(RunId(9)).is_none());
    }
}
