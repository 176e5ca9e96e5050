// crates/result-grid-index/src/lib.rs
// ============================================================================
// Module: Index Root
// Description: Public API surface for the sharded test-results index.
// Purpose: Wire together tables, shards, filters, and the index snapshot.
// Dependencies: crate::{deadline, error, filter, index, shard, tables}
// ============================================================================

//! ## Overview
//! The index is an immutable snapshot of (run, test) → status facts split
//! across N shards keyed by `id mod N`. Reads fan out one worker per shard
//! and join over a bounded channel; writes derive a whole new snapshot by
//! copy-and-merge, so readers never coordinate with writers.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod deadline;
pub mod error;
pub mod filter;
pub mod index;
pub mod shard;
pub mod tables;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deadline::DEADLINE_CHECK_INTERVAL;
pub use deadline::Deadline;
pub use error::IndexError;
pub use filter::BoundFilter;
pub use filter::FilterSpec;
pub use index::Index;
pub use shard::Shard;
pub use tables::Results;
pub use tables::Tests;
