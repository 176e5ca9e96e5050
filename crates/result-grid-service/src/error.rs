// crates/result-grid-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: Request-level error taxonomy and HTTP status mapping.
// Purpose: Collapse leaf errors into the kinds the HTTP surface exposes.
// Dependencies: axum, result-grid-core, thiserror
// ============================================================================

//! ## Overview
//! Leaf errors propagate up verbatim and collapse here into the taxonomy
//! the HTTP layer exposes: bad requests, missing runs, fetch and report
//! failures, identifier fabrication failures, aborted requests, and
//! internal faults. Every kind carries enough text to diagnose a failure
//! from the response body alone.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use result_grid_core::RunId;
use result_grid_index::IndexError;
use result_grid_query::ParseError;
use result_grid_store::ReportError;
use result_grid_store::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request-level errors surfaced by the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Missing or malformed query parameters, or a query parse failure.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The metadata store has no record for the run.
    #[error("run {0} not found")]
    RunNotFound(RunId),
    /// The raw report could not be fetched.
    #[error("report fetch from {url} failed: {detail}")]
    Fetch {
        /// The report URL.
        url: String,
        /// Status or transport detail.
        detail: String,
    },
    /// The raw report was malformed or empty.
    #[error("report invalid: {0}")]
    InvalidReport(String),
    /// Identifier fabrication collided with the reserved zero value.
    #[error("invalid test id: {0}")]
    InvalidTestId(String),
    /// The per-request deadline passed or the client went away.
    #[error("request aborted: deadline exceeded")]
    Aborted,
    /// An unexpected internal condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RunNotFound(_) => StatusCode::NOT_FOUND,
            // 499: client-closed-request convention for expired deadlines.
            Self::Aborted => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Fetch { .. }
            | Self::InvalidReport(_)
            | Self::InvalidTestId(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<ParseError> for ServiceError {
    fn from(error: ParseError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RunNotFound(id) => Self::RunNotFound(id),
            StoreError::Policy(message)
            | StoreError::Backend(message)
            | StoreError::Decode(message) => Self::Internal(message),
        }
    }
}

impl From<ReportError> for ServiceError {
    fn from(error: ReportError) -> Self {
        match error {
            ReportError::Status {
                status,
                url,
            } => Self::Fetch {
                url,
                detail: format!("http status {status}"),
            },
            ReportError::Transport {
                url,
                message,
            } => Self::Fetch {
                url,
                detail: message,
            },
            ReportError::InvalidUrl {
                url,
                message,
            }
            | ReportError::Policy {
                url,
                message,
            } => Self::Fetch {
                url,
                detail: message,
            },
            ReportError::TooLarge {
                ..
            } => Self::InvalidReport(error.to_string()),
            ReportError::Invalid(message) => Self::InvalidReport(message),
            ReportError::Empty => Self::InvalidReport("report contains no results".to_string()),
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::InvalidTestId(inner) => Self::InvalidTestId(inner.to_string()),
            IndexError::Aborted => Self::Aborted,
            IndexError::Worker(message) => Self::Internal(message),
        }
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
    fn every_kind_maps_to_its_documented_status() {
        assert_eq!(ServiceError::BadRequest(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::RunNotFound(RunId(1)).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ServiceError::Aborted.status_code().as_u16(), 499);
        assert_eq!(
            ServiceError::InvalidReport(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Internal(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn aborted_scans_map_to_aborted_requests() {
        assert_eq!(ServiceError::from(IndexError::Aborted), ServiceError::Aborted);
    }

    #[test]
    fn empty_reports_are_invalid_not_fetch_failures() {
        let err = ServiceError::from(ReportError::Empty);
        assert!(matches!(err, ServiceError::InvalidReport(_)));
    }
}
