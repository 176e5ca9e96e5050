// crates/result-grid-service/src/ingest.rs
// ============================================================================
// Module: Run Ingest
// Description: Whole-run ingestion into new index snapshots.
// Purpose: Fetch, decode, merge, and publish one run's facts atomically.
// Dependencies: crate::{error, state}, result-grid-store, tokio, tracing
// ============================================================================

//! ## Overview
//! Ingestion is whole-run: a run's record names a raw report, the report's
//! facts merge into a copy of the current snapshot, and the copy replaces
//! the published reference. Any failure along the way leaves the published
//! snapshot untouched. The optional startup preload walks the most recent
//! runs and loads each in order, logging and skipping failures so startup
//! never blocks on a bad run.

use std::sync::Arc;
use std::time::Instant;

use result_grid_core::RunId;
use result_grid_core::TestRun;
use tracing::info;
use tracing::warn;

use crate::error::ServiceError;
use crate::state::ServiceState;

// ============================================================================
// SECTION: Load Run
// ============================================================================

/// Loads one run by id: record lookup, report fetch, merge, publish.
///
/// # Errors
///
/// Returns [`ServiceError::RunNotFound`] for unknown run ids and the
/// fetch/report/identifier errors of the underlying steps. The published
/// snapshot is unchanged on failure.
pub async fn load_run(state: &ServiceState, run_id: RunId) -> Result<(), ServiceError> {
    let run = state.store().get_run(run_id).await?;
    ingest_run(state, &run).await
}

/// Ingests a run whose record is already in hand.
///
/// # Errors
///
/// Returns fetch, report, and identifier errors from the underlying steps.
pub async fn ingest_run(state: &ServiceState, run: &TestRun) -> Result<(), ServiceError> {
    // Serialize with other ingests so the copy bases on the latest snapshot.
    let _guard = state.lock_ingest().await;

    let report = state.fetcher().fetch(&run.raw_results_url).await?;
    let run_id = run.id;
    let fact_count = report.results.len();
    let base = state.snapshot();

    let started = Instant::now();
    let next = tokio::task::spawn_blocking(move || base.with_run_results(run_id, &report.results))
        .await
        .map_err(|err| ServiceError::Internal(format!("ingest worker failed: {err}")))??;

    state.publish(Arc::new(next));
    info!(
        run = %run_id,
        entries = fact_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run ingested"
    );
    Ok(())
}

// ============================================================================
// SECTION: Startup Preload
// ============================================================================

/// Loads the most recent runs on startup, skipping individual failures.
pub async fn preload_recent(state: Arc<ServiceState>) {
    let count = state.config().ingest.preload_runs;
    if count == 0 {
        info!("no initial runs to preload");
        return;
    }

    info!(count, "loading initial runs");
    let runs = match state.store().recent_runs(count).await {
        Ok(runs) => runs,
        Err(err) => {
            warn!(error = %err, "initial run listing failed");
            return;
        }
    };

    for run in runs {
        match ingest_run(&state, &run).await {
            Ok(()) => info!(run = %run.id, "initial run loaded"),
            Err(err) => warn!(run = %run.id, error = %err, "skipping initial run"),
        }
    }
    info!("initial runs loaded");
}
