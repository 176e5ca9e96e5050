// crates/result-grid-query/src/ast.rs
// ============================================================================
// Module: Query AST
// Description: Parse tree for the boolean query language.
// Purpose: Represent name and result atoms under And/Or/Not combinators.
// Dependencies: result-grid-core, smallvec
// ============================================================================

//! ## Overview
//! The AST mirrors the surface grammar: two atom kinds and three
//! combinators. Both explicit `and` and juxtaposition produce the same
//! [`Query::And`] shape, so downstream planning never distinguishes them.

use result_grid_core::RunId;
use result_grid_core::TestStatus;
use smallvec::SmallVec;

// ============================================================================
// SECTION: Query Tree
// ============================================================================

/// One node of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Matches tests whose stored name contains the substring.
    Name(String),
    /// Matches tests whose result in the run equals the status.
    ResultEq {
        /// Run the fact must come from.
        run: RunId,
        /// Status the fact must equal.
        status: TestStatus,
    },
    /// All children must match.
    And(SmallVec<[Box<Query>; 4]>),
    /// At least one child must match.
    Or(SmallVec<[Box<Query>; 4]>),
    /// The child must not match.
    Not(Box<Query>),
}

impl Query {
    /// Creates a name atom.
    #[must_use]
    pub fn name(query: impl Into<String>) -> Self {
        Self::Name(query.into())
    }

    /// Creates a result-equality atom.
    #[must_use]
    pub const fn result_eq(run: RunId, status: TestStatus) -> Self {
        Self::ResultEq {
            run,
            status,
        }
    }

    /// Creates a conjunction, collapsing the single-child case.
    #[must_use]
    pub fn and(mut parts: Vec<Self>) -> Self {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Self::And(parts.into_iter().map(Box::new).collect())
    }

    /// Creates a disjunction, collapsing the single-child case.
    #[must_use]
    pub fn or(mut parts: Vec<Self>) -> Self {
        if parts.len() == 1 {
            return parts.remove(0);
        }
        Self::Or(parts.into_iter().map(Box::new).collect())
    }

    /// Creates a negation.
    #[must_use]
    pub fn negate(part: Self) -> Self {
        Self::Not(Box::new(part))
    }
}
