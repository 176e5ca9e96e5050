// crates/result-grid-index/src/filter.rs
// ============================================================================
// Module: Scan Filters
// Description: Closed predicate algebra over test ids within one shard.
// Purpose: Define unbound filter trees and their shard-bound evaluators.
// Dependencies: crate::{shard, tables}, result-grid-core, smallvec
// ============================================================================

//! ## Overview
//! Filters form a small closed vocabulary: a name-substring leaf, a
//! result-equality leaf, and the And/Or/Not combinators. An unbound
//! [`FilterSpec`] is built once per query; binding it against a shard
//! resolves shard-local lookups (notably the per-run result column) so the
//! hot evaluation path touches no maps it can resolve up front.

use result_grid_core::ResultId;
use result_grid_core::RunId;
use result_grid_core::TestId;
use smallvec::SmallVec;

use crate::shard::Shard;
use crate::tables::Tests;

// ============================================================================
// SECTION: Unbound Filters
// ============================================================================

/// An unbound predicate tree over test ids.
///
/// The vocabulary is closed by design; each variant evaluates directly with
/// no dynamic dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// True when the shard's stored string for the id contains the substring.
    TestName(String),
    /// True when the shard holds a fact for (run, id) equal to the result.
    ResultEq(RunId, ResultId),
    /// True when every child is true. Empty And is trivially satisfied.
    And(SmallVec<[Box<FilterSpec>; 4]>),
    /// True when at least one child is true. Empty Or is unsatisfiable.
    Or(SmallVec<[Box<FilterSpec>; 4]>),
    /// Inverts the child.
    Not(Box<FilterSpec>),
}

impl FilterSpec {
    /// Creates a name-substring leaf.
    #[must_use]
    pub fn name(query: impl Into<String>) -> Self {
        Self::TestName(query.into())
    }

    /// Creates a result-equality leaf.
    #[must_use]
    pub const fn result_eq(run: RunId, result: ResultId) -> Self {
        Self::ResultEq(run, result)
    }

    /// Creates a logical AND of the given filters.
    #[must_use]
    pub fn and(filters: Vec<Self>) -> Self {
        Self::And(filters.into_iter().map(Box::new).collect())
    }

    /// Creates a logical OR of the given filters.
    #[must_use]
    pub fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters.into_iter().map(Box::new).collect())
    }

    /// Creates a logical NOT of the given filter.
    #[must_use]
    pub fn negate(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Binds this tree against one shard, resolving shard-local lookups.
    #[must_use]
    pub fn bind<'s>(&'s self, shard: &'s Shard) -> BoundFilter<'s> {
        match self {
            Self::TestName(query) => BoundFilter::TestName {
                query,
                tests: shard.tests(),
            },
            Self::ResultEq(run, want) => BoundFilter::ResultEq {
                column: shard.results().run_column(*run),
                want: *want,
            },
            Self::And(children) => {
                BoundFilter::And(children.iter().map(|child| child.bind(shard)).collect())
            }
            Self::Or(children) => {
                BoundFilter::Or(children.iter().map(|child| child.bind(shard)).collect())
            }
            Self::Not(child) => BoundFilter::Not(Box::new(child.bind(shard))),
        }
    }
}

// ============================================================================
// SECTION: Bound Filters
// ============================================================================

/// A filter bound against one shard's tables.
#[derive(Debug)]
pub enum BoundFilter<'s> {
    /// Name-substring leaf over the shard's tests table.
    TestName {
        /// Substring to search for in the stored string.
        query: &'s str,
        /// The shard's tests table.
        tests: &'s Tests,
    },
    /// Result-equality leaf over one run's result column.
    ResultEq {
        /// The run's column in this shard, when the shard has seen the run.
        column: Option<&'s std::collections::HashMap<TestId, ResultId>>,
        /// Result the fact must equal. Absent facts compare unequal.
        want: ResultId,
    },
    /// Short-circuiting AND over bound children.
    And(Vec<BoundFilter<'s>>),
    /// Short-circuiting OR over bound children.
    Or(Vec<BoundFilter<'s>>),
    /// Inversion of a bound child.
    Not(Box<BoundFilter<'s>>),
}

impl BoundFilter<'_> {
    /// Evaluates the filter for one test id with aggressive short-circuiting.
    #[must_use]
    pub fn eval(&self, id: TestId) -> bool {
        match self {
            Self::TestName {
                query,
                tests,
            } => tests.stored(id).is_some_and(|stored| stored.contains(*query)),
            Self::ResultEq {
                column,
                want,
            } => column.is_some_and(|column| column.get(&id) == Some(want)),
            Self::And(children) => children.iter().all(|child| child.eval(id)),
            Self::Or(children) => children.iter().any(|child| child.eval(id)),
            Self::Not(child) => !child.eval(id),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
