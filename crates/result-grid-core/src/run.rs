// crates/result-grid-core/src/run.rs
// ============================================================================
// Module: Run Metadata
// Description: Metadata record for one test-suite execution.
// Purpose: Mirror the external metadata store's `TestRun` contract.
// Dependencies: chrono, serde
// ============================================================================

//! ## Overview
//! The metadata store hands out one `TestRun` record per suite execution,
//! identifying the browser build that produced it and naming the report
//! payloads in the object store. The record is consumed as-is; the grid
//! never writes it back.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::RunId;

// ============================================================================
// SECTION: Test Run
// ============================================================================

/// Metadata for one execution of the test suite by a browser build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    /// Identifier assigned by the metadata store.
    pub id: RunId,
    /// Browser that produced the run.
    pub browser_name: String,
    /// Browser version string.
    pub browser_version: String,
    /// Operating system name.
    pub os_name: String,
    /// Operating system version string.
    pub os_version: String,
    /// Creation timestamp; listings order by this field descending.
    pub created_at: DateTime<Utc>,
    /// URL of the summarized results payload.
    pub results_url: String,
    /// URL of the raw report JSON consumed by ingest.
    pub raw_results_url: String,
    /// Free-form labels attached by the uploader.
    #[serde(default)]
    pub labels: Vec<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn labels_default_to_empty() {
        let run: TestRun = serde_json::from_value(serde_json::json!({
            "id": 7,
            "browser_name": "firefox",
            "browser_version": "141.0",
            "os_name": "linux",
            "os_version": "22.04",
            "created_at": "2026-07-01T12:00:00Z",
            "results_url": "https://storage.example/7-summary.json.gz",
            "raw_results_url": "https://storage.example/7-report.json"
        }))
        .unwrap();
        assert_eq!(run.id, RunId(7));
        assert!(run.labels.is_empty());
    }
}
