// crates/result-grid-store/src/report.rs
// ============================================================================
// Module: Report Fetcher
// Description: Bounded fetch and decode of raw report JSON.
// Purpose: Turn a run's raw-results URL into a validated report payload.
// Dependencies: reqwest, result-grid-core, url
// ============================================================================

//! ## Overview
//! Ingest names a URL in the object store; the URL comes from an external
//! record, so it is untrusted. The client enforces the outbound host
//! policy (private and link-local addresses refused unless configured),
//! disables redirects and re-validates the response peer, caps payload
//! size, rejects non-success statuses with the observed code, and refuses
//! reports whose result list is empty so an ingest can never publish a
//! fact-free run.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use result_grid_core::RawReport;
use thiserror::Error;
use url::Url;

use crate::policy::HostPolicy;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while fetching or decoding a raw report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The report URL failed to parse or used an unsupported scheme.
    #[error("invalid report url {url}: {message}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parse failure detail.
        message: String,
    },
    /// The report URL violates the outbound host policy.
    #[error("report url {url} refused: {message}")]
    Policy {
        /// The offending URL text.
        url: String,
        /// Policy violation detail.
        message: String,
    },
    /// The transport failed before a status was received.
    #[error("report fetch from {url} failed: {message}")]
    Transport {
        /// The report URL.
        url: String,
        /// Transport failure detail.
        message: String,
    },
    /// The object store answered with a non-success status.
    #[error("report fetch from {url} answered http status {status}")]
    Status {
        /// HTTP status code received.
        status: u16,
        /// The report URL.
        url: String,
    },
    /// The payload exceeded the configured size cap.
    #[error("report exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Observed payload size in bytes.
        actual_bytes: usize,
    },
    /// The payload was not a valid report document.
    #[error("report invalid: {0}")]
    Invalid(String),
    /// The report parsed but carried no results.
    #[error("report contains no results")]
    Empty,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the report fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFetcherConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum report size allowed, in bytes.
    pub max_report_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Optional host allowlist for report URLs.
    pub allowed_hosts: Option<Vec<String>>,
    /// Whether private and link-local addresses are allowed.
    pub allow_private_networks: bool,
}

impl Default for ReportFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_report_bytes: 256 * 1024 * 1024,
            user_agent: "result-grid/0.1".to_string(),
            allowed_hosts: None,
            allow_private_networks: false,
        }
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Bounded HTTP fetcher for raw report JSON.
#[derive(Debug, Clone)]
pub struct ReportFetcher {
    /// HTTP client used for outbound requests.
    client: Client,
    /// Outbound host policy for report URLs.
    policy: HostPolicy,
    /// Maximum report size allowed, in bytes.
    max_report_bytes: usize,
}

impl ReportFetcher {
    /// Creates a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &ReportFetcherConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| ReportError::Transport {
                url: String::new(),
                message: format!("http client init failed: {err}"),
            })?;
        let mut policy = HostPolicy::new();
        if let Some(hosts) = &config.allowed_hosts {
            policy = policy.allow_hosts(hosts);
        }
        if config.allow_private_networks {
            policy = policy.allow_private_networks();
        }
        Ok(Self {
            client,
            policy,
            max_report_bytes: config.max_report_bytes,
        })
    }

    /// Fetches and decodes the report at the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on policy violations, transport failure,
    /// non-success status, oversized payloads, malformed documents, or an
    /// empty result list.
    pub async fn fetch(&self, raw_url: &str) -> Result<RawReport, ReportError> {
        let url = Url::parse(raw_url).map_err(|err| ReportError::InvalidUrl {
            url: raw_url.to_string(),
            message: err.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ReportError::InvalidUrl {
                    url: raw_url.to_string(),
                    message: format!("unsupported scheme {scheme}"),
                });
            }
        }
        self.policy.enforce(&url).map_err(|err| ReportError::Policy {
            url: raw_url.to_string(),
            message: err.to_string(),
        })?;

        let response =
            self.client.get(url.clone()).send().await.map_err(|err| ReportError::Transport {
                url: raw_url.to_string(),
                message: err.to_string(),
            })?;
        if response.url() != &url {
            return Err(ReportError::Transport {
                url: raw_url.to_string(),
                message: format!("redirected from {url} to {}", response.url()),
            });
        }
        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status {
                status: status.as_u16(),
                url: raw_url.to_string(),
            });
        }
        if let Some(length) = response.content_length()
            && length > self.max_report_bytes as u64
        {
            return Err(ReportError::TooLarge {
                max_bytes: self.max_report_bytes,
                actual_bytes: usize::try_from(length).unwrap_or(usize::MAX),
            });
        }
        let bytes = response.bytes().await.map_err(|err| ReportError::Transport {
            url: raw_url.to_string(),
            message: err.to_string(),
        })?;
        if bytes.len() > self.max_report_bytes {
            return Err(ReportError::TooLarge {
                max_bytes: self.max_report_bytes,
                actual_bytes: bytes.len(),
            });
        }

        let report: RawReport =
            serde_json::from_slice(&bytes).map_err(|err| ReportError::Invalid(err.to_string()))?;
        if report.results.is_empty() {
            return Err(ReportError::Empty);
        }
        Ok(report)
    }
}
