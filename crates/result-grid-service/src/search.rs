// crates/result-grid-service/src/search.rs
// ============================================================================
// Module: Search and Aggregation
// Description: Query execution and per-test pass/total aggregation.
// Purpose: Turn a query string and run list into sorted result rows.
// Dependencies: crate::{error, state}, result-grid-query, serde, tokio
// ============================================================================

//! ## Overview
//! A search parses and plans the query, captures the current snapshot once,
//! scans for matching ids, then resolves names and per-run results in
//! parallel. Matching ids that share a display name (a test seen bare in
//! one run and with subtests in another) merge into a single output row.
//! Rows sort ascending by test name; each row's status vector aligns with
//! the request's run order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use result_grid_core::RunId;
use result_grid_core::result_is_passing;
use result_grid_query::parse;
use result_grid_query::plan;
use result_grid_query::to_filter;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::error::ServiceError;
use crate::state::ServiceState;

// ============================================================================
// SECTION: Response Types
// ============================================================================

/// Pass and total counts for one test in one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Number of matched facts with a passing status.
    pub passes: u32,
    /// Number of matched facts with any known status.
    pub total: u32,
}

/// One output row: a test name and its per-run counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Display name of the test.
    pub test: String,
    /// Counts aligned with the request's run order.
    pub status: Vec<RunStatus>,
}

/// The search response payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Rows sorted ascending by test name.
    pub results: Vec<SearchResult>,
}

// ============================================================================
// SECTION: Search
// ============================================================================

/// Executes a query against the current snapshot and aggregates the hits.
///
/// # Errors
///
/// Returns [`ServiceError::BadRequest`] for parse failures,
/// [`ServiceError::Aborted`] when the deadline passes mid-scan, and
/// [`ServiceError::Internal`] for worker faults.
pub async fn search(
    state: &ServiceState,
    run_ids: &[RunId],
    raw_query: &str,
) -> Result<SearchResponse, ServiceError> {
    let parsed = parse(raw_query)?;
    let planned = plan(parsed);
    let spec = Arc::new(to_filter(&planned));

    // One capture; the whole request sees a single consistent snapshot.
    let index = state.snapshot();
    let deadline = state.request_deadline();

    let started = Instant::now();
    let matched = index.query(&spec, deadline).await?;
    info!(
        matched = matched.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "query scan complete"
    );

    let started = Instant::now();
    let (names, results) = tokio::try_join!(
        index.get_names(&matched, deadline),
        index.get_results(run_ids, &matched, deadline),
    )?;

    let mut rows: BTreeMap<String, Vec<RunStatus>> = BTreeMap::new();
    for id in &matched {
        let Some(name) = names.get(id) else {
            continue;
        };
        let Some(statuses) = results.get(id) else {
            continue;
        };
        let row = rows
            .entry(name.clone())
            .or_insert_with(|| vec![RunStatus::default(); run_ids.len()]);
        for (slot, result) in row.iter_mut().zip(statuses) {
            if result_is_passing(*result) {
                slot.passes += 1;
            }
            if result.is_known() {
                slot.total += 1;
            }
        }
    }

    info!(
        rows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregation complete"
    );

    // BTreeMap iteration is already ascending by test name.
    let results = rows
        .into_iter()
        .map(|(test, status)| SearchResult {
            test,
            status,
        })
        .collect();
    Ok(SearchResponse {
        results,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions."
    )]

    use std::sync::Arc;

    use result_grid_core::TestEntry;
    use result_grid_index::Index;
    use result_grid_store::InMemoryRunStore;

    use super::*;
    use crate::config::GridConfig;

    fn state_with_runs() -> ServiceState {
        let state =
            ServiceState::new(GridConfig::default(), Arc::new(InMemoryRunStore::new())).unwrap();
        let index = Index::new(4)
            .with_run_results(
                RunId(1),
                &[
                    TestEntry::new("t1", "PASS"),
                    TestEntry::new("t2", "FAIL"),
                ],
            )
            .unwrap()
            .with_run_results(RunId(2), &[TestEntry::new("t1", "OK")])
            .unwrap();
        state.publish(Arc::new(index));
        state
    }

    #[tokio::test]
    async fn aggregation_matches_the_documented_example() {
        // Corpus: (r1,t1,PASS), (r1,t2,FAIL), (r2,t1,OK).
        let state = state_with_runs();
        let response = search(&state, &[RunId(1), RunId(2)], "t").await.unwrap();
        assert_eq!(
            response.results,
            vec![
                SearchResult {
                    test: "t1".to_string(),
                    status: vec![
                        RunStatus {
                            passes: 1,
                            total: 1,
                        },
                        RunStatus {
                            passes: 1,
                            total: 1,
                        },
                    ],
                },
                SearchResult {
                    test: "t2".to_string(),
                    status: vec![
                        RunStatus {
                            passes: 0,
                            total: 1,
                        },
                        RunStatus {
                            passes: 0,
                            total: 0,
                        },
                    ],
                },
            ]
        );
    }

    #[tokio::test]
    async fn subtest_rows_merge_into_one_row_by_display_name() {
        let state =
            ServiceState::new(GridConfig::default(), Arc::new(InMemoryRunStore::new())).unwrap();
        let entry = TestEntry::new("/dom/a.html", "OK")
            .with_subtest("first", "PASS")
            .with_subtest("second", "FAIL");
        let index = Index::new(4).with_run_results(RunId(1), &[entry]).unwrap();
        state.publish(Arc::new(index));

        let response = search(&state, &[RunId(1)], "/dom/").await.unwrap();
        assert_eq!(response.results.len(), 1);
        let row = &response.results[0];
        assert_eq!(row.test, "/dom/a.html");
        // OK + PASS count as passes; all three facts are known.
        assert_eq!(
            row.status,
            vec![RunStatus {
                passes: 2,
                total: 3,
            }]
        );
    }

    #[tokio::test]
    async fn parse_failures_become_bad_requests() {
        let state = state_with_runs();
        let outcome = search(&state, &[RunId(1)], "a ^ b").await;
        assert!(matches!(outcome, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_results() {
        let state =
            ServiceState::new(GridConfig::default(), Arc::new(InMemoryRunStore::new())).unwrap();
        let response = search(&state, &[RunId(1)], "foo").await.unwrap();
        assert!(response.results.is_empty());
    }
}
