// crates/result-grid-core/src/identifiers.rs
// ============================================================================
// Module: Grid Identifiers
// Description: Test, run, and result identifiers with fabrication rules.
// Purpose: Define `TestId`, `RunId`, `ResultId` and the name fingerprint.
// Dependencies: serde, thiserror, xxhash-rust
// ============================================================================

//! ## Overview
//! A `TestId` is a 64-bit fingerprint of the canonical test name; zero is
//! reserved and never a valid identifier. Subtests fingerprint the
//! concatenation `test ⟨NUL⟩ subtest`, and display names are recovered by
//! splitting the stored string on the NUL separator. `RunId` and `ResultId`
//! are opaque signed integers supplied by the external system.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between a test name and a subtest name in a stored string.
pub const SUBTEST_SEPARATOR: char = '\0';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while fabricating identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The fingerprint collided with the reserved zero value.
    #[error("test name fingerprints to the reserved zero id: {stored}")]
    ZeroFingerprint {
        /// The stored string whose fingerprint was zero.
        stored: String,
    },
}

// ============================================================================
// SECTION: Test Id
// ============================================================================

/// A unique identifier for a test or subtest.
///
/// The identifier is a deterministic 64-bit fingerprint of the stored name,
/// so the same name always fabricates the same id. Zero is reserved and is
/// rejected at fabrication time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TestId(NonZeroU64);

impl TestId {
    /// Creates a test id from a known non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Attempts to create a test id, returning `None` when the raw value is zero.
    #[must_use]
    pub fn from_raw(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self::new)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0.get()
    }

    /// Returns the shard index for this id in an index of `num_shards` shards.
    #[must_use]
    pub const fn shard(&self, num_shards: usize) -> usize {
        (self.value() % num_shards as u64) as usize
    }

    /// Fabricates the id for a test or subtest, returning the stored string
    /// alongside it.
    ///
    /// A subtest stores `test ⟨NUL⟩ subtest`; a bare test stores its name
    /// unchanged. An empty subtest name is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::ZeroFingerprint`] when the fingerprint
    /// collides with the reserved zero value.
    pub fn fabricate(name: &str, subtest: Option<&str>) -> Result<(Self, String), IdentifierError> {
        let stored = match subtest {
            Some(sub) if !sub.is_empty() => format!("{name}{SUBTEST_SEPARATOR}{sub}"),
            _ => name.to_string(),
        };
        match Self::from_raw(xxh3_64(stored.as_bytes())) {
            Some(id) => Ok((id, stored)),
            None => Err(IdentifierError::ZeroFingerprint {
                stored,
            }),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<TestId> for u64 {
    fn from(id: TestId) -> Self {
        id.value()
    }
}

/// Returns the display portion of a stored string (everything before the
/// subtest separator, or the whole string when no subtest is present).
#[must_use]
pub fn display_name(stored: &str) -> &str {
    stored.split(SUBTEST_SEPARATOR).next().unwrap_or(stored)
}

// ============================================================================
// SECTION: Run Id
// ============================================================================

/// An identifier for one execution of the test suite by a browser build.
///
/// Supplied by the external metadata store and treated opaquely.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[repr(transparent)]
pub struct RunId(pub i64);

impl RunId {
    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RunId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// SECTION: Result Id
// ============================================================================

/// The numeric form of a test status.
///
/// Zero is `UNKNOWN`, the value reported for any (run, test) pair the index
/// has no fact for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[repr(transparent)]
pub struct ResultId(pub i64);

impl ResultId {
    /// The result id reported for absent facts.
    pub const UNKNOWN: Self = Self(0);

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns true when this result represents a known (loaded) fact.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.0 != Self::UNKNOWN.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResultId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
