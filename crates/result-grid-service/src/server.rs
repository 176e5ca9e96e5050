// crates/result-grid-service/src/server.rs
// ============================================================================
// Module: HTTP Surface
// Description: Axum router and request handlers for the search service.
// Purpose: Bind ingest and search to the documented endpoints.
// Dependencies: crate::{error, ingest, search, state}, axum, tokio, url
// ============================================================================

//! ## Overview
//! Four endpoints: `/load-run` triggers a whole-run ingest, `/q` executes a
//! search across a caller-selected run list, and the `/_ah/*` pair answers
//! platform health probes. Query strings are parsed by hand because
//! `run_id` repeats; every handler body runs under the per-request timeout
//! and maps errors through [`ServiceError`].

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use result_grid_core::RunId;
use tokio::net::TcpListener;

use crate::error::ServiceError;
use crate::ingest;
use crate::search;
use crate::state::ServiceState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the service router over shared state.
#[must_use]
pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/load-run", get(handle_load_run))
        .route("/q", get(handle_search))
        .route("/_ah/liveness_check", get(handle_liveness))
        .route("/_ah/readiness_check", get(handle_readiness))
        .with_state(state)
}

/// Serves the router on an already-bound listener until the server fails.
///
/// # Errors
///
/// Returns [`ServiceError::Internal`] when the server loop fails.
pub async fn serve(state: Arc<ServiceState>, listener: TcpListener) -> Result<(), ServiceError> {
    axum::serve(listener, router(state))
        .await
        .map_err(|err| ServiceError::Internal(format!("http server failed: {err}")))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `GET /load-run?run_id=N`.
async fn handle_load_run(
    State(state): State<Arc<ServiceState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let outcome = with_request_timeout(&state, async {
        let params = parse_query_pairs(query.as_deref());
        let run_id = single_run_id(&params)?;
        ingest::load_run(&state, run_id).await
    })
    .await;
    match outcome {
        Ok(()) => (StatusCode::OK, "Run loaded").into_response(),
        Err(err) => err.into_response(),
    }
}

/// Handles `GET /q?run_id=N&run_id=M&q=QUERY`.
async fn handle_search(
    State(state): State<Arc<ServiceState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let outcome = with_request_timeout(&state, async {
        let params = parse_query_pairs(query.as_deref());
        let run_ids = run_id_params(&params)?;
        let raw_query = single_param(&params, "q")?;
        search::search(&state, &run_ids, raw_query).await
    })
    .await;
    match outcome {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Handles the platform liveness probe.
async fn handle_liveness() -> &'static str {
    "alive"
}

/// Handles the platform readiness probe.
async fn handle_readiness() -> &'static str {
    "ready"
}

/// Bounds a handler body by the configured per-request timeout.
async fn with_request_timeout<T>(
    state: &ServiceState,
    body: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    match tokio::time::timeout(state.request_timeout(), body).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ServiceError::Aborted),
    }
}

// ============================================================================
// SECTION: Parameter Parsing
// ============================================================================

/// Decodes the raw query string into key/value pairs.
fn parse_query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.unwrap_or("").as_bytes()).into_owned().collect()
}

/// Requires exactly one occurrence of a parameter.
fn single_param<'a>(
    params: &'a [(String, String)],
    key: &str,
) -> Result<&'a str, ServiceError> {
    let mut values = params.iter().filter(|(name, _)| name == key).map(|(_, value)| value);
    let Some(first) = values.next() else {
        return Err(ServiceError::BadRequest(format!("missing {key} query parameter")));
    };
    if values.next().is_some() {
        return Err(ServiceError::BadRequest(format!("too many {key} query parameters")));
    }
    Ok(first)
}

/// Requires exactly one `run_id` parameter parsed as a 64-bit integer.
fn single_run_id(params: &[(String, String)]) -> Result<RunId, ServiceError> {
    let raw = single_param(params, "run_id")?;
    parse_run_id(raw)
}

/// Requires at least one `run_id` parameter, preserving request order.
fn run_id_params(params: &[(String, String)]) -> Result<Vec<RunId>, ServiceError> {
    let raws: Vec<&str> = params
        .iter()
        .filter(|(name, _)| name == "run_id")
        .map(|(_, value)| value.as_str())
        .collect();
    if raws.is_empty() {
        return Err(ServiceError::BadRequest("missing run_id query parameter".to_string()));
    }
    raws.into_iter().map(parse_run_id).collect()
}

/// Parses one run id value.
fn parse_run_id(raw: &str) -> Result<RunId, ServiceError> {
    raw.parse::<i64>().map(RunId).map_err(|_| {
        ServiceError::BadRequest(format!("malformed run_id query parameter: {raw}"))
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "Test-only assertions.")]

    use super::*;

    fn pairs(raw: &str) -> Vec<(String, String)> {
        parse_query_pairs(Some(raw))
    }

    #[test]
    fn single_param_enforces_exactly_one() {
        assert_eq!(single_param(&pairs("q=foo"), "q").unwrap(), "foo");
        assert!(single_param(&pairs(""), "q").is_err());
        assert!(single_param(&pairs("q=a&q=b"), "q").is_err());
    }

    #[test]
    fn run_id_params_preserve_order_and_reject_garbage() {
        let ids = run_id_params(&pairs("run_id=3&run_id=-7&run_id=1")).unwrap();
        assert_eq!(ids, vec![RunId(3), RunId(-7), RunId(1)]);

        assert!(run_id_params(&pairs("q=foo")).is_err());
        assert!(run_id_params(&pairs("run_id=abc")).is_err());
        assert!(run_id_params(&pairs("run_id=")).is_err());
    }

    #[test]
    fn percent_encoded_queries_decode() {
        let params = pairs("q=%2Fdom%2F%20and%207%3DPASS");
        assert_eq!(single_param(&params, "q").unwrap(), "/dom/ and 7=PASS");
    }
}
