// crates/result-grid-service/src/main.rs
// ============================================================================
// Module: Service Entry Point
// Description: CLI for the in-memory test-results search service.
// Purpose: Load config, wire the state, and run the HTTP server.
// Dependencies: clap, result-grid-service, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary loads configuration (TOML file, environment variable, CLI
//! overrides), builds the service state around the configured metadata
//! store, spawns the heap watchdog and the initial-run preload, then serves
//! HTTP until told to stop.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use result_grid_service::ServiceError;
use result_grid_service::ServiceState;
use result_grid_service::config::GridConfig;
use result_grid_service::ingest;
use result_grid_service::monitor;
use result_grid_service::server;
use result_grid_store::HttpRunStore;
use result_grid_store::HttpRunStoreConfig;
use result_grid_store::InMemoryRunStore;
use result_grid_store::RunStore;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// In-memory search service over web-platform test-run results.
#[derive(Parser, Debug)]
#[command(name = "result-grid", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Port to listen on, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
    /// Number of index shards, overriding the config file.
    #[arg(long)]
    num_shards: Option<usize>,
    /// Number of latest runs to preload on startup.
    #[arg(long)]
    preload_runs: Option<usize>,
    /// Base URL of the run-metadata store.
    #[arg(long)]
    store_base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
    /// Heap ceiling in bytes for the watchdog.
    #[arg(long)]
    heap_ceiling_bytes: Option<u64>,
}

impl Cli {
    /// Applies CLI overrides on top of the loaded configuration.
    fn apply(&self, config: &mut GridConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(num_shards) = self.num_shards {
            config.index.num_shards = Some(num_shards);
        }
        if let Some(preload_runs) = self.preload_runs {
            config.ingest.preload_runs = preload_runs;
        }
        if let Some(base_url) = &self.store_base_url {
            config.store.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = self.request_timeout_ms {
            config.server.request_timeout_ms = timeout;
        }
        if let Some(ceiling) = self.heap_ceiling_bytes {
            config.monitor.heap_ceiling_bytes = ceiling;
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(&Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "service failed");
            ExitCode::FAILURE
        }
    }
}

/// Builds and runs the service.
async fn run(cli: &Cli) -> Result<(), ServiceError> {
    let mut config = GridConfig::load(cli.config.as_deref())
        .map_err(|err| ServiceError::Internal(err.to_string()))?;
    cli.apply(&mut config);
    config.validate().map_err(|err| ServiceError::Internal(err.to_string()))?;

    let store = build_store(&config)?;
    let num_shards = config.effective_shards();
    let heap_ceiling = config.monitor.heap_ceiling_bytes;
    let monitor_interval = Duration::from_millis(config.monitor.interval_ms);
    let bind = format!("{}:{}", config.server.bind, config.server.port);

    let state = Arc::new(ServiceState::new(config, store)?);

    monitor::spawn_heap_watchdog(heap_ceiling, monitor_interval);
    tokio::spawn(ingest::preload_recent(Arc::clone(&state)));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| ServiceError::Internal(format!("bind to {bind} failed: {err}")))?;
    info!(%bind, num_shards, "listening");
    server::serve(state, listener).await
}

/// Builds the configured metadata-store client.
fn build_store(config: &GridConfig) -> Result<Arc<dyn RunStore>, ServiceError> {
    match &config.store.base_url {
        Some(base_url) => {
            let store = HttpRunStore::new(&HttpRunStoreConfig {
                base_url: base_url.clone(),
                timeout_ms: config.store.timeout_ms,
                max_response_bytes: config.store.max_response_bytes,
                user_agent: "result-grid/0.1".to_string(),
                allowed_hosts: config.store.allowed_hosts.clone(),
                allow_private_networks: config.store.allow_private_networks,
            })
            .map_err(|err| ServiceError::Internal(err.to_string()))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("no store.base_url configured, runs cannot be loaded from outside");
            Ok(Arc::new(InMemoryRunStore::new()))
        }
    }
}
