// crates/result-grid-query/tests/plan_equivalence.rs
// ============================================================================
// Module: Planner Equivalence Tests
// Description: Planned and naive query evaluation agree on every corpus.
// ============================================================================
//! ## Overview
//! The planner only reorders conjunction children, so for any generated
//! query tree and corpus, evaluating the planned tree must select exactly
//! the ids the unplanned tree selects.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only panic-based assertions."
)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::LazyLock;

use proptest::prelude::*;
use result_grid_core::RunId;
use result_grid_core::TestEntry;
use result_grid_core::TestId;
use result_grid_core::TestStatus;
use result_grid_index::Deadline;
use result_grid_index::Index;
use result_grid_query::Query;
use result_grid_query::plan;
use result_grid_query::to_filter;

/// Shared runtime so property cases avoid per-case runtime startup.
static RUNTIME: LazyLock<tokio::runtime::Runtime> =
    LazyLock::new(|| tokio::runtime::Runtime::new().unwrap());

const NAME_POOL: [&str; 4] = ["/dom/a.html", "/dom/b.html", "/css/c.html", "/svg/d.svg"];
const QUERY_POOL: [&str; 4] = ["/dom/", "/css/", "d", "/other/"];
const STATUS_POOL: [TestStatus; 3] = [TestStatus::Pass, TestStatus::Ok, TestStatus::Fail];

fn run_entries() -> impl Strategy<Value = Vec<TestEntry>> {
    prop::collection::vec((0usize .. NAME_POOL.len(), 0usize .. STATUS_POOL.len()), 0 .. 10)
        .prop_map(|facts| {
            facts
                .into_iter()
                .map(|(name_idx, status_idx)| {
                    TestEntry::new(NAME_POOL[name_idx], STATUS_POOL[status_idx].as_token())
                })
                .collect()
        })
}

fn query_tree() -> impl Strategy<Value = Query> {
    let leaf = prop_oneof![
        (0usize .. QUERY_POOL.len()).prop_map(|idx| Query::name(QUERY_POOL[idx])),
        (1i64 ..= 2, 0usize .. STATUS_POOL.len()).prop_map(|(run, status_idx)| {
            Query::result_eq(RunId(run), STATUS_POOL[status_idx])
        }),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2 .. 4).prop_map(Query::and),
            prop::collection::vec(inner.clone(), 2 .. 4).prop_map(Query::or),
            inner.prop_map(Query::negate),
        ]
    })
}

fn matches(index: &Arc<Index>, query: &Query) -> HashSet<TestId> {
    RUNTIME
        .block_on(index.query(&Arc::new(to_filter(query)), Deadline::none()))
        .unwrap()
        .into_iter()
        .collect()
}

proptest! {
    #[test]
    fn planned_queries_select_the_same_ids(
        run1 in run_entries(),
        run2 in run_entries(),
        query in query_tree(),
    ) {
        let index = Index::new(3)
            .with_run_results(RunId(1), &run1)
            .unwrap()
            .with_run_results(RunId(2), &run2)
            .unwrap();
        let index = Arc::new(index);

        let naive = matches(&index, &query);
        let planned = matches(&index, &plan(query));
        prop_assert_eq!(naive, planned);
    }
}
