// crates/result-grid-core/src/status.rs
// ============================================================================
// Module: Status Taxonomy
// Description: Closed enumeration of test and subtest outcomes.
// Purpose: Map between status tokens and their canonical result ids.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! Statuses form a small closed taxonomy. `UNKNOWN` doubles as the value
//! reported for facts the index does not contain, so it maps to result id
//! zero. Report payloads carry statuses as uppercase tokens; unrecognized
//! tokens degrade to `UNKNOWN` rather than failing the whole report.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ResultId;

// ============================================================================
// SECTION: Status Enum
// ============================================================================

/// Outcome of running a test or subtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// No fact recorded, or an unrecognized status token.
    Unknown,
    /// A subtest-style pass.
    Pass,
    /// A harness-level pass.
    Ok,
    /// The harness reported an error.
    Error,
    /// The test timed out.
    Timeout,
    /// The test was not run.
    NotRun,
    /// The test failed.
    Fail,
    /// The browser crashed.
    Crash,
}

/// Every status in canonical result-id order.
pub const ALL_STATUSES: [TestStatus; 8] = [
    TestStatus::Unknown,
    TestStatus::Pass,
    TestStatus::Ok,
    TestStatus::Error,
    TestStatus::Timeout,
    TestStatus::NotRun,
    TestStatus::Fail,
    TestStatus::Crash,
];

impl TestStatus {
    /// Returns the canonical numeric form of this status.
    #[must_use]
    pub const fn as_result_id(self) -> ResultId {
        match self {
            Self::Unknown => ResultId(0),
            Self::Pass => ResultId(1),
            Self::Ok => ResultId(2),
            Self::Error => ResultId(3),
            Self::Timeout => ResultId(4),
            Self::NotRun => ResultId(5),
            Self::Fail => ResultId(6),
            Self::Crash => ResultId(7),
        }
    }

    /// Returns the status for a result id, or `None` for values outside the
    /// taxonomy.
    #[must_use]
    pub const fn from_result_id(id: ResultId) -> Option<Self> {
        match id.value() {
            0 => Some(Self::Unknown),
            1 => Some(Self::Pass),
            2 => Some(Self::Ok),
            3 => Some(Self::Error),
            4 => Some(Self::Timeout),
            5 => Some(Self::NotRun),
            6 => Some(Self::Fail),
            7 => Some(Self::Crash),
            _ => None,
        }
    }

    /// Returns the canonical uppercase token for this status.
    #[must_use]
    pub const fn as_token(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Pass => "PASS",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::NotRun => "NOT_RUN",
            Self::Fail => "FAIL",
            Self::Crash => "CRASH",
        }
    }

    /// Parses a status token, matching case-insensitively.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        ALL_STATUSES.into_iter().find(|status| status.as_token().eq_ignore_ascii_case(token))
    }

    /// Parses a report status token, degrading unrecognized tokens to
    /// `UNKNOWN` as the ingest path requires.
    #[must_use]
    pub fn from_report_token(token: &str) -> Self {
        Self::from_token(token).unwrap_or(Self::Unknown)
    }

    /// Returns true when the status counts as a pass in aggregation.
    #[must_use]
    pub const fn is_passing(self) -> bool {
        matches!(self, Self::Pass | Self::Ok)
    }
}

/// Returns true when a raw result id counts as a pass in aggregation.
#[must_use]
pub const fn result_is_passing(id: ResultId) -> bool {
    matches!(id.value(), 1 | 2)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn result_ids_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(TestStatus::from_result_id(status.as_result_id()), Some(status));
        }
        assert_eq!(TestStatus::from_result_id(ResultId(99)), None);
    }

    #[test]
    fn tokens_round_trip_case_insensitively() {
        assert_eq!(TestStatus::from_token("PASS"), Some(TestStatus::Pass));
        assert_eq!(TestStatus::from_token("pass"), Some(TestStatus::Pass));
        assert_eq!(TestStatus::from_token("Not_Run"), Some(TestStatus::NotRun));
        assert_eq!(TestStatus::from_token("bogus"), None);
    }

    #[test]
    fn report_tokens_degrade_to_unknown() {
        assert_eq!(TestStatus::from_report_token("CRASH"), TestStatus::Crash);
        assert_eq!(TestStatus::from_report_token("PRECONDITION_FAILED"), TestStatus::Unknown);
    }

    #[test]
    fn only_pass_and_ok_count_as_passing() {
        for status in ALL_STATUSES {
            let expected = matches!(status, TestStatus::Pass | TestStatus::Ok);
            assert_eq!(status.is_passing(), expected);
            assert_eq!(result_is_passing(status.as_result_id()), expected);
        }
    }
}
