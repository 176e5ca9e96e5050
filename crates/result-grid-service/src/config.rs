// crates/result-grid-service/src/config.rs
// ============================================================================
// Module: Service Configuration
// Description: Configuration loading and validation for the search service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file named by the `--config` flag or
//! the `RESULT_GRID_CONFIG` environment variable, with strict size limits
//! and fail-closed validation; with neither set, built-in defaults apply.
//! Every field also has a CLI flag override on the service binary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::thread;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to locate the config file.
pub const CONFIG_ENV_VAR: &str = "RESULT_GRID_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Default listening port.
const DEFAULT_PORT: u16 = 8080;
/// Default bind address.
const DEFAULT_BIND: &str = "0.0.0.0";
/// Default per-request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum allowed per-request timeout in milliseconds.
const MIN_REQUEST_TIMEOUT_MS: u64 = 1;
/// Maximum allowed per-request timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Maximum allowed shard count.
const MAX_NUM_SHARDS: usize = 512;
/// Fallback shard count when core-count detection fails.
const FALLBACK_NUM_SHARDS: usize = 4;
/// Default number of latest runs preloaded on startup.
const DEFAULT_PRELOAD_RUNS: usize = 50;
/// Maximum allowed preload count.
const MAX_PRELOAD_RUNS: usize = 1_000;
/// Default report fetch timeout in milliseconds.
const DEFAULT_REPORT_TIMEOUT_MS: u64 = 60_000;
/// Default maximum raw report size in bytes.
const DEFAULT_MAX_REPORT_BYTES: usize = 256 * 1024 * 1024;
/// Default metadata-store request timeout in milliseconds.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;
/// Default maximum metadata-store response size in bytes.
const DEFAULT_STORE_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// Default heap ceiling in bytes; ingest transiently doubles the index
/// footprint, so the ceiling must allow twice the steady state.
const DEFAULT_HEAP_CEILING_BYTES: u64 = 45_000_000_000;
/// Minimum allowed heap ceiling in bytes.
const MIN_HEAP_CEILING_BYTES: u64 = 64 * 1024 * 1024;
/// Default heap watchdog sampling interval in milliseconds.
const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2_000;
/// Minimum allowed watchdog sampling interval in milliseconds.
const MIN_MONITOR_INTERVAL_MS: u64 = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("config read failed: {0}")]
    Io(String),
    /// The config file exceeds the size limit.
    #[error("config file exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        actual_bytes: u64,
    },
    /// The config file is not valid TOML for this schema.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// A field value is outside its allowed range.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Index settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Ingest settings.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Metadata-store client settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Heap watchdog settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request deadline in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Index settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Number of shards; unset means one per available core.
    #[serde(default)]
    pub num_shards: Option<usize>,
}

/// Ingest settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Number of latest runs loaded on startup; zero disables the preload.
    #[serde(default = "default_preload_runs")]
    pub preload_runs: usize,
    /// Report fetch timeout in milliseconds.
    #[serde(default = "default_report_timeout_ms")]
    pub report_timeout_ms: u64,
    /// Maximum raw report size in bytes.
    #[serde(default = "default_max_report_bytes")]
    pub max_report_bytes: usize,
    /// Optional host allowlist for report URLs.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
    /// Whether report URLs may resolve to private or link-local addresses.
    #[serde(default)]
    pub allow_private_networks: bool,
}

/// Metadata-store client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Base URL of the metadata store API; unset means an in-memory store.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    #[serde(default = "default_store_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Optional host allowlist for store endpoints.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
    /// Whether store endpoints may resolve to private or link-local
    /// addresses.
    #[serde(default)]
    pub allow_private_networks: bool,
}

/// Heap watchdog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Resident-set ceiling in bytes; exceeding it is fatal.
    #[serde(default = "default_heap_ceiling_bytes")]
    pub heap_ceiling_bytes: u64,
    /// Sampling interval in milliseconds.
    #[serde(default = "default_monitor_interval_ms")]
    pub interval_ms: u64,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_preload_runs() -> usize {
    DEFAULT_PRELOAD_RUNS
}

const fn default_report_timeout_ms() -> u64 {
    DEFAULT_REPORT_TIMEOUT_MS
}

const fn default_max_report_bytes() -> usize {
    DEFAULT_MAX_REPORT_BYTES
}

const fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

const fn default_store_max_response_bytes() -> usize {
    DEFAULT_STORE_MAX_RESPONSE_BYTES
}

const fn default_heap_ceiling_bytes() -> u64 {
    DEFAULT_HEAP_CEILING_BYTES
}

const fn default_monitor_interval_ms() -> u64 {
    DEFAULT_MONITOR_INTERVAL_MS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            preload_runs: default_preload_runs(),
            report_timeout_ms: default_report_timeout_ms(),
            max_report_bytes: default_max_report_bytes(),
            allowed_hosts: None,
            allow_private_networks: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_store_timeout_ms(),
            max_response_bytes: default_store_max_response_bytes(),
            allowed_hosts: None,
            allow_private_networks: false,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heap_ceiling_bytes: default_heap_ceiling_bytes(),
            interval_ms: default_monitor_interval_ms(),
        }
    }
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl GridConfig {
    /// Loads configuration from the given path, the `RESULT_GRID_CONFIG`
    /// environment variable, or built-in defaults, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named file is unreadable, oversized,
    /// malformed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved: Option<PathBuf> = match path {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };
        let Some(path) = resolved else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };

        let metadata = fs::metadata(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                max_bytes: MAX_CONFIG_FILE_SIZE,
                actual_bytes: metadata.len(),
            });
        }
        let text = fs::read_to_string(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: Self = toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.server.request_timeout_ms;
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&timeout) {
            return Err(ConfigError::Invalid(format!(
                "server.request_timeout_ms must be within {MIN_REQUEST_TIMEOUT_MS}..={MAX_REQUEST_TIMEOUT_MS}, got {timeout}"
            )));
        }
        if let Some(num_shards) = self.index.num_shards {
            if num_shards == 0 || num_shards > MAX_NUM_SHARDS {
                return Err(ConfigError::Invalid(format!(
                    "index.num_shards must be within 1..={MAX_NUM_SHARDS}, got {num_shards}"
                )));
            }
        }
        if self.ingest.preload_runs > MAX_PRELOAD_RUNS {
            return Err(ConfigError::Invalid(format!(
                "ingest.preload_runs must be at most {MAX_PRELOAD_RUNS}, got {}",
                self.ingest.preload_runs
            )));
        }
        if self.ingest.report_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "ingest.report_timeout_ms must be positive".to_string(),
            ));
        }
        if self.ingest.max_report_bytes == 0 {
            return Err(ConfigError::Invalid(
                "ingest.max_report_bytes must be positive".to_string(),
            ));
        }
        if let Some(base_url) = &self.store.base_url {
            Url::parse(base_url).map_err(|err| {
                ConfigError::Invalid(format!("store.base_url is not a valid url: {err}"))
            })?;
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::Invalid("store.timeout_ms must be positive".to_string()));
        }
        if self.monitor.heap_ceiling_bytes < MIN_HEAP_CEILING_BYTES {
            return Err(ConfigError::Invalid(format!(
                "monitor.heap_ceiling_bytes must be at least {MIN_HEAP_CEILING_BYTES}, got {}",
                self.monitor.heap_ceiling_bytes
            )));
        }
        if self.monitor.interval_ms < MIN_MONITOR_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "monitor.interval_ms must be at least {MIN_MONITOR_INTERVAL_MS}, got {}",
                self.monitor.interval_ms
            )));
        }
        Ok(())
    }

    /// The effective shard count: the configured value, or one per core.
    #[must_use]
    pub fn effective_shards(&self) -> usize {
        self.index.num_shards.unwrap_or_else(|| {
            thread::available_parallelism().map_or(FALLBACK_NUM_SHARDS, NonZeroUsize::get)
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
