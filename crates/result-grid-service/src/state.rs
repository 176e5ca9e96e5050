// crates/result-grid-service/src/state.rs
// ============================================================================
// Module: Service State
// Description: Shared state behind the HTTP handlers.
// Purpose: Own the current-index cell, the ingest lock, and client handles.
// Dependencies: crate::config, result-grid-index, result-grid-store, tokio
// ============================================================================

//! ## Overview
//! The current index snapshot is the single piece of shared mutable state.
//! Readers clone the `Arc` once per request and work against an immutable
//! value; ingest builds a complete replacement and swaps the reference.
//! Two ingests serialize on a mutex so each bases its copy on the latest
//! published snapshot; queries never take that lock.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use result_grid_index::Deadline;
use result_grid_index::Index;
use result_grid_store::ReportFetcher;
use result_grid_store::ReportFetcherConfig;
use result_grid_store::RunStore;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use crate::config::GridConfig;
use crate::error::ServiceError;

// ============================================================================
// SECTION: Service State
// ============================================================================

/// Shared state for every request handler.
pub struct ServiceState {
    /// The currently published index snapshot.
    current: RwLock<Arc<Index>>,
    /// Serializes ingests so each observes the latest snapshot as its base.
    ingest_lock: Mutex<()>,
    /// Metadata-store client.
    store: Arc<dyn RunStore>,
    /// Raw-report fetcher.
    fetcher: ReportFetcher,
    /// Service configuration.
    config: GridConfig,
}

impl ServiceState {
    /// Builds the service state with an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] when the report fetcher cannot be
    /// constructed.
    pub fn new(config: GridConfig, store: Arc<dyn RunStore>) -> Result<Self, ServiceError> {
        let fetcher = ReportFetcher::new(&ReportFetcherConfig {
            timeout_ms: config.ingest.report_timeout_ms,
            max_report_bytes: config.ingest.max_report_bytes,
            user_agent: "result-grid/0.1".to_string(),
            allowed_hosts: config.ingest.allowed_hosts.clone(),
            allow_private_networks: config.ingest.allow_private_networks,
        })
        .map_err(|err| ServiceError::Internal(err.to_string()))?;
        let index = Index::new(config.effective_shards());
        Ok(Self {
            current: RwLock::new(Arc::new(index)),
            ingest_lock: Mutex::new(()),
            store,
            fetcher,
            config,
        })
    }

    /// Captures the current snapshot reference.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Index> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes a new snapshot, replacing the current reference.
    pub fn publish(&self, next: Arc<Index>) {
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Takes the ingest lock for the duration of one snapshot derivation.
    pub async fn lock_ingest(&self) -> MutexGuard<'_, ()> {
        self.ingest_lock.lock().await
    }

    /// The metadata-store client.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// The raw-report fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &ReportFetcher {
        &self.fetcher
    }

    /// The service configuration.
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.server.request_timeout_ms)
    }

    /// A fresh deadline for one request.
    #[must_use]
    pub fn request_deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout())
    }
}
