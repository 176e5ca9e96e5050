// crates/result-grid-index/src/index.rs
// ============================================================================
// Module: Sharded Index
// Description: Immutable snapshot of test identities and status facts.
// Purpose: Derive new snapshots by copy-and-merge; serve parallel reads.
// Dependencies: crate::{deadline, error, filter, shard}, result-grid-core, tokio
// ============================================================================

//! ## Overview
//! An `Index` is a fixed-length sequence of shards plus the set of loaded
//! run ids. Snapshots are immutable: ingest deep-copies the current
//! snapshot, merges one run's facts, and hands back a new value, so readers
//! holding an `Arc<Index>` never coordinate with writers.
//!
//! Every multi-shard read uses the same fan-out shape: one blocking task per
//! shard, joined through a bounded channel sized to the shard count, then
//! concatenated. Shard workers recheck the request deadline between scan
//! chunks and abort rather than emit partial results.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use result_grid_core::ResultId;
use result_grid_core::RunId;
use result_grid_core::TestEntry;
use result_grid_core::TestId;
use result_grid_core::TestStatus;
use tokio::sync::mpsc;

use crate::deadline::DEADLINE_CHECK_INTERVAL;
use crate::deadline::Deadline;
use crate::error::IndexError;
use crate::filter::FilterSpec;
use crate::shard::Shard;

// ============================================================================
// SECTION: Index
// ============================================================================

/// Sharded snapshot of test identities and per-(run, test) statuses.
///
/// Shards sit behind `Arc` so read workers can hold their shard across a
/// blocking scan without borrowing from the index itself.
#[derive(Debug, Clone)]
pub struct Index {
    /// Shards; a test id lives in shard `id mod shards.len()`.
    shards: Vec<Arc<Shard>>,
    /// Every run id whose facts have been merged into this snapshot.
    runs: HashSet<RunId>,
}

impl Index {
    /// Creates an empty index with the given number of shards (minimum one).
    #[must_use]
    pub fn new(num_shards: usize) -> Self {
        let num_shards = num_shards.max(1);
        Self {
            shards: (0 .. num_shards).map(|_| Arc::new(Shard::default())).collect(),
            runs: HashSet::new(),
        }
    }

    /// Number of shards, fixed at construction.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of loaded runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Total number of test identities across all shards.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.tests().len()).sum()
    }

    /// Returns true when the run's facts are part of this snapshot.
    #[must_use]
    pub fn has_run(&self, run: RunId) -> bool {
        self.runs.contains(&run)
    }

    /// The shard index a test id belongs to.
    #[must_use]
    pub fn shard_of(&self, id: TestId) -> usize {
        id.shard(self.shards.len())
    }

    // ========================================================================
    // SECTION: Snapshot Derivation
    // ========================================================================

    /// Derives a new snapshot containing every fact of this one plus the
    /// supplied run's facts. Adding the run id to the run set is idempotent.
    ///
    /// Each entry contributes a fact for the test itself and one per named
    /// subtest; subtests fingerprint `test ⟨NUL⟩ subtest`, so a test seen
    /// both bare and with subtests yields distinct ids that later collapse
    /// to the same display name.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidTestId`] when any fabricated id collides
    /// with the reserved zero value; the current snapshot is unaffected.
    pub fn with_run_results(&self, run: RunId, entries: &[TestEntry]) -> Result<Self, IndexError> {
        let mut shards: Vec<Shard> =
            self.shards.iter().map(|shard| (**shard).clone()).collect();
        let mut runs = self.runs.clone();
        runs.insert(run);

        for entry in entries {
            let status = TestStatus::from_report_token(&entry.status).as_result_id();
            add_fact(&mut shards, run, &entry.test, None, status)?;
            for subtest in &entry.subtests {
                let status = TestStatus::from_report_token(&subtest.status).as_result_id();
                add_fact(&mut shards, run, &entry.test, Some(&subtest.name), status)?;
            }
        }

        Ok(Self {
            shards: shards.into_iter().map(Arc::new).collect(),
            runs,
        })
    }

    // ========================================================================
    // SECTION: Single Lookups
    // ========================================================================

    /// Returns the display name for a test id, when the index knows it.
    #[must_use]
    pub fn get_name(&self, id: TestId) -> Option<&str> {
        self.shards[self.shard_of(id)].tests().name(id)
    }

    /// Returns the result for (run, test), or `UNKNOWN` for absent facts.
    #[must_use]
    pub fn get_result(&self, run: RunId, id: TestId) -> ResultId {
        self.shards[self.shard_of(id)].results().get(run, id)
    }

    // ========================================================================
    // SECTION: Parallel Reads
    // ========================================================================

    /// Fans the filter out to every shard in parallel and concatenates the
    /// matches. Result ordering is unspecified; callers needing a stable
    /// order must sort.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Aborted`] when the deadline passes mid-scan and
    /// [`IndexError::Worker`] when a shard worker fails to report.
    pub async fn query(
        &self,
        spec: &Arc<FilterSpec>,
        deadline: Deadline,
    ) -> Result<Vec<TestId>, IndexError> {
        let shard_count = self.shards.len();
        let (tx, rx) = mpsc::channel(shard_count);
        for shard in &self.shards {
            let shard = Arc::clone(shard);
            let spec = Arc::clone(spec);
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                let _ = tx.blocking_send(shard.execute(&spec, deadline));
            });
        }
        drop(tx);

        let mut matched = Vec::new();
        collect_shard_outputs(rx, shard_count, |ids: Vec<TestId>| matched.extend(ids)).await?;
        Ok(matched)
    }

    /// Looks up display names for a batch of ids, partitioned by shard and
    /// resolved in parallel. Ids unknown to the index are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Aborted`] on deadline expiry and
    /// [`IndexError::Worker`] when a shard worker fails to report.
    pub async fn get_names(
        &self,
        ids: &[TestId],
        deadline: Deadline,
    ) -> Result<HashMap<TestId, String>, IndexError> {
        let by_shard = self.partition_by_shard(ids);
        let shard_count = self.shards.len();
        let (tx, rx) = mpsc::channel(shard_count);
        for (shard, shard_ids) in self.shards.iter().zip(by_shard) {
            let shard = Arc::clone(shard);
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                let _ = tx.blocking_send(resolve_names(&shard, shard_ids, deadline));
            });
        }
        drop(tx);

        let mut names = HashMap::with_capacity(ids.len());
        collect_shard_outputs(rx, shard_count, |named: Vec<(TestId, String)>| {
            names.extend(named);
        })
        .await?;
        Ok(names)
    }

    /// Looks up results for a batch of ids across the requested runs. Each
    /// id maps to one result per run, in request order, with `UNKNOWN`
    /// filling absent facts.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Aborted`] on deadline expiry and
    /// [`IndexError::Worker`] when a shard worker fails to report.
    pub async fn get_results(
        &self,
        runs: &[RunId],
        ids: &[TestId],
        deadline: Deadline,
    ) -> Result<HashMap<TestId, Vec<ResultId>>, IndexError> {
        let by_shard = self.partition_by_shard(ids);
        let shard_count = self.shards.len();
        let runs: Arc<[RunId]> = Arc::from(runs);
        let (tx, rx) = mpsc::channel(shard_count);
        for (shard, shard_ids) in self.shards.iter().zip(by_shard) {
            let shard = Arc::clone(shard);
            let runs = Arc::clone(&runs);
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                let _ = tx.blocking_send(resolve_results(&shard, &runs, shard_ids, deadline));
            });
        }
        drop(tx);

        let mut by_id = HashMap::with_capacity(ids.len());
        collect_shard_outputs(rx, shard_count, |rows: Vec<(TestId, Vec<ResultId>)>| {
            by_id.extend(rows);
        })
        .await?;
        Ok(by_id)
    }

    /// Splits a batch of ids into one bucket per shard.
    fn partition_by_shard(&self, ids: &[TestId]) -> Vec<Vec<TestId>> {
        let mut by_shard = vec![Vec::new(); self.shards.len()];
        for id in ids {
            by_shard[self.shard_of(*id)].push(*id);
        }
        by_shard
    }
}

// ============================================================================
// SECTION: Shard Workers
// ============================================================================

/// Fabricates the id for one fact and records it in the owning shard.
fn add_fact(
    shards: &mut [Shard],
    run: RunId,
    name: &str,
    subtest: Option<&str>,
    result: ResultId,
) -> Result<(), IndexError> {
    let (id, stored) = TestId::fabricate(name, subtest)?;
    let shard_idx = id.shard(shards.len());
    shards[shard_idx].add_fact(id, stored, run, result);
    Ok(())
}

/// Resolves display names for one shard's bucket of ids.
fn resolve_names(
    shard: &Shard,
    ids: Vec<TestId>,
    deadline: Deadline,
) -> Result<Vec<(TestId, String)>, IndexError> {
    let tests = shard.tests();
    let mut named = Vec::with_capacity(ids.len());
    for (scanned, id) in ids.into_iter().enumerate() {
        if scanned % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
            return Err(IndexError::Aborted);
        }
        if let Some(name) = tests.name(id) {
            named.push((id, name.to_string()));
        }
    }
    Ok(named)
}

/// Resolves per-run result rows for one shard's bucket of ids.
fn resolve_results(
    shard: &Shard,
    runs: &[RunId],
    ids: Vec<TestId>,
    deadline: Deadline,
) -> Result<Vec<(TestId, Vec<ResultId>)>, IndexError> {
    let results = shard.results();
    let mut rows = Vec::with_capacity(ids.len());
    for (scanned, id) in ids.into_iter().enumerate() {
        if scanned % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
            return Err(IndexError::Aborted);
        }
        let row: Vec<ResultId> = runs.iter().map(|run| results.get(*run, id)).collect();
        rows.push((id, row));
    }
    Ok(rows)
}

/// Receives exactly one output per shard, folding successes and propagating
/// the first failure.
async fn collect_shard_outputs<T>(
    mut rx: mpsc::Receiver<Result<T, IndexError>>,
    shard_count: usize,
    mut fold: impl FnMut(T),
) -> Result<(), IndexError> {
    for _ in 0 .. shard_count {
        match rx.recv().await {
            Some(Ok(output)) => fold(output),
            Some(Err(err)) => return Err(err),
            None => {
                return Err(IndexError::Worker(
                    "shard worker exited without reporting".to_string(),
                ));
            }
        }
    }
    Ok(())
}
