// crates/result-grid-store/src/memory.rs
// ============================================================================
// Module: In-Memory Run Store
// Description: Map-backed run store for tests and local runs.
// Purpose: Provide the store contract without any external system.
// Dependencies: crate::run_store, result-grid-core
// ============================================================================

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use result_grid_core::RunId;
use result_grid_core::TestRun;

use crate::run_store::RunStore;
use crate::run_store::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Run store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    /// Records keyed by run id.
    runs: RwLock<HashMap<RunId, TestRun>>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a run record.
    pub fn insert(&self, run: TestRun) {
        if let Ok(mut runs) = self.runs.write() {
            runs.insert(run.id, run);
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.read().map_or(0, |runs| runs.len())
    }

    /// Returns true when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn get_run(&self, id: RunId) -> Result<TestRun, StoreError> {
        let runs =
            self.runs.read().map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        runs.get(&id).cloned().ok_or(StoreError::RunNotFound(id))
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<TestRun>, StoreError> {
        let runs =
            self.runs.read().map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        let mut records: Vec<TestRun> = runs.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    fn run(id: i64, day: u32) -> TestRun {
        TestRun {
            id: RunId(id),
            browser_name: "firefox".to_string(),
            browser_version: "141.0".to_string(),
            os_name: "linux".to_string(),
            os_version: "22.04".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).single().unwrap(),
            results_url: format!("https://storage.example/{id}-summary.json.gz"),
            raw_results_url: format!("https://storage.example/{id}-report.json"),
            labels: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_runs_are_not_found() {
        let store = InMemoryRunStore::new();
        assert_eq!(store.get_run(RunId(7)).await, Err(StoreError::RunNotFound(RunId(7))));
    }

    #[tokio::test]
    async fn recent_runs_order_newest_first_and_honor_the_limit() {
        let store = InMemoryRunStore::new();
        store.insert(run(1, 1));
        store.insert(run(2, 3));
        store.insert(run(3, 2));

        let recent = store.recent_runs(2).await.unwrap();
        let ids: Vec<RunId> = recent.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![RunId(2), RunId(3)]);
    }
}
