// crates/result-grid-index/tests/filter_laws.rs
// ============================================================================
// Module: Filter Law Tests
// Description: Property tests for the boolean filter algebra.
// ============================================================================
//! ## Overview
//! For arbitrary corpora and filter trees, `Not` partitions the id universe
//! and `And`/`Or` agree with set intersection/union of their children's
//! match sets.

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
use result_grid_index::FilterSpec;
use result_grid_index::Index;

/// Shared runtime so property cases avoid per-case runtime startup.
static RUNTIME: LazyLock<tokio::runtime::Runtime> =
    LazyLock::new(|| tokio::runtime::Runtime::new().unwrap());

const NAME_POOL: [&str; 5] = ["/dom/a.html", "/dom/b.html", "/css/c.html", "/css/d.html", "/svg/e.svg"];
const QUERY_POOL: [&str; 5] = ["/dom/", "/css/", "a", "e", "/missing/"];
const STATUS_POOL: [TestStatus; 4] =
    [TestStatus::Pass, TestStatus::Ok, TestStatus::Fail, TestStatus::Timeout];

/// One run's worth of generated facts.
fn run_entries() -> impl Strategy<Value = Vec<TestEntry>> {
    prop::collection::vec((0usize .. NAME_POOL.len(), 0usize .. STATUS_POOL.len()), 0 .. 12)
        .prop_map(|facts| {
            facts
                .into_iter()
                .map(|(name_idx, status_idx)| {
                    TestEntry::new(NAME_POOL[name_idx], STATUS_POOL[status_idx].as_token())
                })
                .collect()
        })
}

/// Arbitrary filter trees over the generated corpus vocabulary.
fn filter_tree() -> impl Strategy<Value = FilterSpec> {
    let leaf = prop_oneof![
        (0usize .. QUERY_POOL.len()).prop_map(|idx| FilterSpec::name(QUERY_POOL[idx])),
        (1i64 ..= 3, 0usize .. STATUS_POOL.len()).prop_map(|(run, status_idx)| {
            FilterSpec::result_eq(RunId(run), STATUS_POOL[status_idx].as_result_id())
        }),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1 .. 3).prop_map(FilterSpec::and),
            prop::collection::vec(inner.clone(), 1 .. 3).prop_map(FilterSpec::or),
            inner.prop_map(FilterSpec::negate),
        ]
    })
}

fn build_index(run1: Vec<TestEntry>, run2: Vec<TestEntry>) -> Arc<Index> {
    let index = Index::new(3)
        .with_run_results(RunId(1), &run1)
        .unwrap()
        .with_run_results(RunId(2), &run2)
        .unwrap();
    Arc::new(index)
}

fn matches(index: &Arc<Index>, spec: FilterSpec) -> HashSet<TestId> {
    RUNTIME
        .block_on(index.query(&Arc::new(spec), Deadline::none()))
        .unwrap()
        .into_iter()
        .collect()
}

proptest! {
    #[test]
    fn not_partitions_the_universe(
        run1 in run_entries(),
        run2 in run_entries(),
        spec in filter_tree(),
    ) {
        let index = build_index(run1, run2);
        let universe = matches(&index, FilterSpec::and(Vec::new()));
        let matched = matches(&index, spec.clone());
        let negated = matches(&index, FilterSpec::negate(spec));

        prop_assert!(matched.is_disjoint(&negated));
        let union: HashSet<TestId> = matched.union(&negated).copied().collect();
        prop_assert_eq!(union, universe);
    }

    #[test]
    fn and_or_agree_with_set_operations(
        run1 in run_entries(),
        run2 in run_entries(),
        left in filter_tree(),
        right in filter_tree(),
    ) {
        let index = build_index(run1, run2);
        let left_ids = matches(&index, left.clone());
        let right_ids = matches(&index, right.clone());

        let and_ids = matches(&index, FilterSpec::and(vec![left.clone(), right.clone()]));
        let or_ids = matches(&index, FilterSpec::or(vec![left, right]));

        let expected_and: HashSet<TestId> = left_ids.intersection(&right_ids).copied().collect();
        let expected_or: HashSet<TestId> = left_ids.union(&right_ids).copied().collect();
        prop_assert_eq!(and_ids, expected_and);
        prop_assert_eq!(or_ids, expected_or);
    }
}
