// crates/result-grid-core/src/report.rs
// ============================================================================
// Module: Raw Report Types
// Description: Wire types for the per-run raw report JSON.
// Purpose: Deserialize report payloads fetched from the object store.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A raw report carries every (test, status) fact produced by one run, with
//! optional named subtests per test. Statuses arrive as string tokens and
//! are mapped to the closed taxonomy at ingest time, so the wire types keep
//! them as strings here.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One run's raw report payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    /// Uploader-provided run metadata; opaque to the grid.
    #[serde(default)]
    pub run_info: serde_json::Map<String, serde_json::Value>,
    /// Per-test facts; an empty list makes the report invalid for ingest.
    #[serde(default)]
    pub results: Vec<TestEntry>,
}

/// One test's facts within a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntry {
    /// Canonical test name.
    pub test: String,
    /// Status token for the test itself.
    pub status: String,
    /// Optional harness message.
    #[serde(default)]
    pub message: Option<String>,
    /// Named subtests with independent statuses.
    #[serde(default)]
    pub subtests: Vec<SubtestEntry>,
}

/// One named subtest's fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtestEntry {
    /// Subtest name, unique within its parent test.
    pub name: String,
    /// Status token for the subtest.
    pub status: String,
    /// Optional harness message.
    #[serde(default)]
    pub message: Option<String>,
}

impl TestEntry {
    /// Creates an entry with no message and no subtests.
    #[must_use]
    pub fn new(test: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: status.into(),
            message: None,
            subtests: Vec::new(),
        }
    }

    /// Adds a named subtest fact.
    #[must_use]
    pub fn with_subtest(mut self, name: impl Into<String>, status: impl Into<String>) -> Self {
        self.subtests.push(SubtestEntry {
            name: name.into(),
            status: status.into(),
            message: None,
        });
        self
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
    fn report_fields_default() {
        let report: RawReport = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert!(report.run_info.is_empty());
        assert!(report.results.is_empty());
    }

    #[test]
    fn entry_parses_subtests() {
        let entry: TestEntry = serde_json::from_value(serde_json::json!({
            "test": "/dom/a.html",
            "status": "OK",
            "message": null,
            "subtests": [{"name": "first", "status": "PASS", "message": null}]
        }))
        .unwrap();
        assert_eq!(entry.subtests.len(), 1);
        assert_eq!(entry.subtests[0].name, "first");
    }
}
