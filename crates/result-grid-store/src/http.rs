// crates/result-grid-store/src/http.rs
// ============================================================================
// Module: HTTP Run Store
// Description: JSON-over-HTTP client for the run-metadata store.
// Purpose: Fetch run records and recent-run listings with strict limits.
// Dependencies: crate::run_store, reqwest, result-grid-core, url
// ============================================================================

//! ## Overview
//! The metadata store is reached over HTTP: `GET {base}/runs/{id}` for one
//! record, `GET {base}/runs?limit=n` for the newest records. Endpoint and
//! responses are untrusted: every request passes the outbound host policy
//! (private and link-local addresses refused unless configured),
//! non-success statuses fail closed, payloads are size-capped, redirects
//! are disabled, and the response peer is re-validated.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use result_grid_core::RunId;
use result_grid_core::TestRun;
use url::Url;

use crate::policy::HostPolicy;
use crate::run_store::RunStore;
use crate::run_store::StoreError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP run store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRunStoreConfig {
    /// Base URL of the metadata store API.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Optional host allowlist for store endpoints.
    pub allowed_hosts: Option<Vec<String>>,
    /// Whether private and link-local addresses are allowed.
    pub allow_private_networks: bool,
}

impl Default for HttpRunStoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 10_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "result-grid/0.1".to_string(),
            allowed_hosts: None,
            allow_private_networks: false,
        }
    }
}

// ============================================================================
// SECTION: HTTP Store
// ============================================================================

/// Run store backed by the metadata store's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRunStore {
    /// HTTP client used for outbound requests.
    client: Client,
    /// Parsed base URL of the store API.
    base: Url,
    /// Outbound host policy for store endpoints.
    policy: HostPolicy,
    /// Maximum response size allowed, in bytes.
    max_response_bytes: usize,
}

impl HttpRunStore {
    /// Creates a store client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the base URL is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &HttpRunStoreConfig) -> Result<Self, StoreError> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|err| StoreError::Backend(format!("invalid store base url: {err}")))?;
        // Url::join treats a path without a trailing slash as a file.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| StoreError::Backend(format!("http client init failed: {err}")))?;
        let mut policy = HostPolicy::new();
        if let Some(hosts) = &config.allowed_hosts {
            policy = policy.allow_hosts(hosts);
        }
        if config.allow_private_networks {
            policy = policy.allow_private_networks();
        }
        Ok(Self {
            client,
            base,
            policy,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Issues a bounded GET and returns the payload bytes.
    async fn fetch_bytes(&self, url: Url) -> Result<(StatusCode, Vec<u8>), StoreError> {
        self.policy.enforce(&url).map_err(|err| StoreError::Policy(err.to_string()))?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| StoreError::Backend(format!("request to {url} failed: {err}")))?;
        if response.url() != &url {
            return Err(StoreError::Backend(format!(
                "redirected from {url} to {}",
                response.url()
            )));
        }
        let status = response.status();
        if let Some(length) = response.content_length()
            && length > self.max_response_bytes as u64
        {
            return Err(StoreError::Backend(format!(
                "response from {url} exceeds {} bytes",
                self.max_response_bytes
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::Backend(format!("read from {url} failed: {err}")))?;
        if bytes.len() > self.max_response_bytes {
            return Err(StoreError::Backend(format!(
                "response from {url} exceeds {} bytes",
                self.max_response_bytes
            )));
        }
        Ok((status, bytes.to_vec()))
    }

    /// Joins a relative path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path)
            .map_err(|err| StoreError::Backend(format!("invalid store endpoint: {err}")))
    }
}

#[async_trait]
impl RunStore for HttpRunStore {
    async fn get_run(&self, id: RunId) -> Result<TestRun, StoreError> {
        let url = self.endpoint(&format!("runs/{id}"))?;
        let (status, bytes) = self.fetch_bytes(url).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::RunNotFound(id));
        }
        if !status.is_success() {
            return Err(StoreError::Backend(format!("run lookup answered {status}")));
        }
        serde_json::from_slice(&bytes).map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<TestRun>, StoreError> {
        let url = self.endpoint(&format!("runs?limit={limit}"))?;
        let (status, bytes) = self.fetch_bytes(url).await?;
        if !status.is_success() {
            return Err(StoreError::Backend(format!("run listing answered {status}")));
        }
        serde_json::from_slice(&bytes).map_err(|err| StoreError::Decode(err.to_string()))
    }
}
