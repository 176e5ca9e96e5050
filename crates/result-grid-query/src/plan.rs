// crates/result-grid-query/src/plan.rs
// ============================================================================
// Module: Query Planner
// Description: Evaluation-order rewrite and lowering to index filters.
// Purpose: Run selective predicates before result-column probes.
// Dependencies: crate::ast, result-grid-index
// ============================================================================

//! ## Overview
//! A status probe commonly matches thousands of tests while a name
//! substring rarely does, so inside any conjunction the planner moves name
//! atoms first, nested combinators second, and result-equality atoms last.
//! Disjunctions and negations pass through with children planned in place.
//! The rewrite never changes what a query matches, only how early each
//! predicate gets the chance to short-circuit.

use result_grid_index::FilterSpec;

use crate::ast::Query;

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Rewrites a parsed query into evaluation order.
#[must_use]
pub fn plan(query: Query) -> Query {
    match query {
        Query::And(children) => {
            let mut names = Vec::new();
            let mut nested = Vec::new();
            let mut results = Vec::new();
            for child in children {
                let planned = plan(*child);
                match planned {
                    Query::Name(_) => names.push(planned),
                    Query::ResultEq {
                        ..
                    } => results.push(planned),
                    _ => nested.push(planned),
                }
            }
            names.extend(nested);
            names.extend(results);
            Query::and(names)
        }
        Query::Or(children) => {
            Query::or(children.into_iter().map(|child| plan(*child)).collect())
        }
        Query::Not(child) => Query::negate(plan(*child)),
        atom @ (Query::Name(_) | Query::ResultEq { .. }) => atom,
    }
}

/// Lowers a query tree to the index's filter vocabulary.
#[must_use]
pub fn to_filter(query: &Query) -> FilterSpec {
    match query {
        Query::Name(name) => FilterSpec::name(name.clone()),
        Query::ResultEq {
            run,
            status,
        } => FilterSpec::result_eq(*run, status.as_result_id()),
        Query::And(children) => {
            FilterSpec::and(children.iter().map(|child| to_filter(child)).collect())
        }
        Query::Or(children) => {
            FilterSpec::or(children.iter().map(|child| to_filter(child)).collect())
        }
        Query::Not(child) => FilterSpec::negate(to_filter(child)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use result_grid_core::RunId;
    use result_grid_core::TestStatus;

    use super::*;

    #[test]
    fn conjunctions_evaluate_names_before_result_probes() {
        let query = Query::and(vec![
            Query::result_eq(RunId(7), TestStatus::Pass),
            Query::name("/dom/"),
            Query::negate(Query::name("manual")),
            Query::result_eq(RunId(8), TestStatus::Fail),
        ]);
        let planned = plan(query);
        let Query::And(children) = planned else {
            panic!("expected a conjunction");
        };
        assert!(matches!(*children[0], Query::Name(_)));
        assert!(matches!(*children[1], Query::Not(_)));
        assert!(matches!(*children[2], Query::ResultEq { .. }));
        assert!(matches!(*children[3], Query::ResultEq { .. }));
    }

    #[test]
    fn reordering_recurses_into_nested_conjunctions() {
        let inner = Query::and(vec![
            Query::result_eq(RunId(1), TestStatus::Ok),
            Query::name("a"),
        ]);
        let query = Query::or(vec![inner, Query::name("b")]);
        let planned = plan(query);
        let Query::Or(children) = planned else {
            panic!("expected a disjunction");
        };
        let Query::And(inner_children) = &*children[0] else {
            panic!("expected the nested conjunction to survive");
        };
        assert!(matches!(*inner_children[0], Query::Name(_)));
        assert!(matches!(*inner_children[1], Query::ResultEq { .. }));
    }

    #[test]
    fn atoms_and_negations_pass_through() {
        let atom = Query::name("/css/");
        assert_eq!(plan(atom.clone()), atom);

        let negated = Query::negate(Query::result_eq(RunId(3), TestStatus::Crash));
        assert_eq!(plan(negated.clone()), negated);
    }

    #[test]
    fn lowering_preserves_tree_shape() {
        let query = Query::and(vec![
            Query::name("/dom/"),
            Query::negate(Query::result_eq(RunId(7), TestStatus::Pass)),
        ]);
        let filter = to_filter(&query);
        let FilterSpec::And(children) = filter else {
            panic!("expected a conjunction filter");
        };
        assert!(matches!(*children[0], FilterSpec::TestName(_)));
        assert!(matches!(*children[1], FilterSpec::Not(_)));
    }
}
