// crates/result-grid-index/src/deadline.rs
// ============================================================================
// Module: Scan Deadlines
// Description: Monotonic per-request deadline for shard workers.
// Purpose: Let CPU-bound scans abort cleanly when a request expires.
// Dependencies: std::time
// ============================================================================

//! ## Overview
//! Shard workers run synchronously on blocking threads, so cancellation is
//! cooperative: every worker rechecks its deadline between scan chunks and
//! aborts with [`crate::IndexError::Aborted`] once it has passed.

use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of test ids scanned between deadline checks.
pub const DEADLINE_CHECK_INTERVAL: usize = 4096;

// ============================================================================
// SECTION: Deadline
// ============================================================================

/// A monotonic deadline, or no deadline at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// Instant after which work must abort; `None` never expires.
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            at: None,
        }
    }

    /// A deadline the given duration from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Returns true once the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn none_never_expires() {
        assert!(!Deadline::none().expired());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        assert!(Deadline::after(Duration::ZERO).expired());
    }

    #[test]
    fn generous_timeout_is_live() {
        assert!(!Deadline::after(Duration::from_secs(3600)).expired());
    }
}
