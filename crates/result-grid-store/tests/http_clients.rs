// crates/result-grid-store/tests/http_clients.rs
// ============================================================================
// Module: HTTP Client Tests
// Description: Run store and report fetcher against a stub object store.
// ============================================================================
//! ## Overview
//! Spins a minimal axum stub serving run records and report payloads, then
//! exercises the fail-closed behavior of both HTTP clients: not-found runs,
//! non-success statuses, malformed documents, empty reports, and the
//! outbound host policy. The stub listens on loopback, so every test that
//! expects a successful fetch opts in to private networks; the policy
//! tests use the default (closed) configuration.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only panic-based assertions."
)]

use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use result_grid_core::RunId;
use result_grid_store::HttpRunStore;
use result_grid_store::HttpRunStoreConfig;
use result_grid_store::ReportError;
use result_grid_store::ReportFetcher;
use result_grid_store::ReportFetcherConfig;
use result_grid_store::RunStore;
use result_grid_store::StoreError;

/// Serves one stub run record plus a handful of report fixtures.
async fn start_stub() -> SocketAddr {
    async fn run_record(Path(id): Path<i64>) -> impl IntoResponse {
        if id == 7 {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": 7,
                    "browser_name": "firefox",
                    "browser_version": "141.0",
                    "os_name": "linux",
                    "os_version": "22.04",
                    "created_at": "2026-07-01T12:00:00Z",
                    "results_url": "https://storage.example/7-summary.json.gz",
                    "raw_results_url": "https://storage.example/7-report.json",
                    "labels": ["stable"]
                })),
            )
                .into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    async fn run_listing() -> impl IntoResponse {
        Json(serde_json::json!([{
            "id": 7,
            "browser_name": "firefox",
            "browser_version": "141.0",
            "os_name": "linux",
            "os_version": "22.04",
            "created_at": "2026-07-01T12:00:00Z",
            "results_url": "https://storage.example/7-summary.json.gz",
            "raw_results_url": "https://storage.example/7-report.json"
        }]))
    }

    async fn report() -> impl IntoResponse {
        Json(serde_json::json!({
            "run_info": {},
            "results": [
                {"test": "/dom/a.html", "status": "PASS", "message": null, "subtests": []},
                {"test": "/dom/b.html", "status": "FAIL", "message": null, "subtests": []}
            ]
        }))
    }

    async fn empty_report() -> impl IntoResponse {
        Json(serde_json::json!({"run_info": {}, "results": []}))
    }

    async fn broken_report() -> impl IntoResponse {
        (StatusCode::OK, "{not json")
    }

    async fn missing_report() -> impl IntoResponse {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn moved_report() -> impl IntoResponse {
        (
            StatusCode::TEMPORARY_REDIRECT,
            [("location", "/report.json")],
        )
    }

    let app = Router::new()
        .route("/runs/{id}", get(run_record))
        .route("/runs", get(run_listing))
        .route("/report.json", get(report))
        .route("/empty.json", get(empty_report))
        .route("/broken.json", get(broken_report))
        .route("/missing.json", get(missing_report))
        .route("/moved.json", get(moved_report));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn store_for(addr: SocketAddr) -> HttpRunStore {
    HttpRunStore::new(&HttpRunStoreConfig {
        base_url: format!("http://{addr}/"),
        allow_private_networks: true,
        ..HttpRunStoreConfig::default()
    })
    .unwrap()
}

fn fetcher() -> ReportFetcher {
    ReportFetcher::new(&ReportFetcherConfig {
        allow_private_networks: true,
        ..ReportFetcherConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn get_run_decodes_the_record() {
    let addr = start_stub().await;
    let store = store_for(addr);
    let run = store.get_run(RunId(7)).await.unwrap();
    assert_eq!(run.id, RunId(7));
    assert_eq!(run.browser_name, "firefox");
    assert_eq!(run.labels, vec!["stable".to_string()]);
}

#[tokio::test]
async fn absent_runs_map_to_run_not_found() {
    let addr = start_stub().await;
    let store = store_for(addr);
    assert_eq!(store.get_run(RunId(99)).await, Err(StoreError::RunNotFound(RunId(99))));
}

#[tokio::test]
async fn recent_runs_decode_the_listing() {
    let addr = start_stub().await;
    let store = store_for(addr);
    let runs = store.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, RunId(7));
}

#[tokio::test]
async fn fetcher_decodes_a_well_formed_report() {
    let addr = start_stub().await;
    let fetcher = fetcher();
    let report = fetcher.fetch(&format!("http://{addr}/report.json")).await.unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].test, "/dom/a.html");
}

#[tokio::test]
async fn empty_reports_are_rejected() {
    let addr = start_stub().await;
    let fetcher = fetcher();
    let outcome = fetcher.fetch(&format!("http://{addr}/empty.json")).await;
    assert_eq!(outcome.unwrap_err(), ReportError::Empty);
}

#[tokio::test]
async fn malformed_reports_are_invalid() {
    let addr = start_stub().await;
    let fetcher = fetcher();
    let outcome = fetcher.fetch(&format!("http://{addr}/broken.json")).await;
    assert!(matches!(outcome, Err(ReportError::Invalid(_))));
}

#[tokio::test]
async fn non_success_statuses_carry_the_code_and_url() {
    let addr = start_stub().await;
    let fetcher = fetcher();
    let url = format!("http://{addr}/missing.json");
    let outcome = fetcher.fetch(&url).await;
    assert_eq!(
        outcome,
        Err(ReportError::Status {
            status: 503,
            url,
        })
    );
}

#[tokio::test]
async fn unsupported_schemes_fail_before_any_io() {
    let fetcher = ReportFetcher::new(&ReportFetcherConfig::default()).unwrap();
    let outcome = fetcher.fetch("file:///etc/passwd").await;
    assert!(matches!(outcome, Err(ReportError::InvalidUrl { .. })));
}

#[tokio::test]
async fn private_report_hosts_are_refused_by_default() {
    let addr = start_stub().await;
    let closed = ReportFetcher::new(&ReportFetcherConfig::default()).unwrap();
    let outcome = closed.fetch(&format!("http://{addr}/report.json")).await;
    assert!(matches!(outcome, Err(ReportError::Policy { .. })));
}

#[tokio::test]
async fn private_store_endpoints_are_refused_by_default() {
    let addr = start_stub().await;
    let closed = HttpRunStore::new(&HttpRunStoreConfig {
        base_url: format!("http://{addr}/"),
        ..HttpRunStoreConfig::default()
    })
    .unwrap();
    assert!(matches!(closed.get_run(RunId(7)).await, Err(StoreError::Policy(_))));
}

#[tokio::test]
async fn report_host_allowlists_refuse_unlisted_hosts() {
    let addr = start_stub().await;
    let listed = ReportFetcher::new(&ReportFetcherConfig {
        allowed_hosts: Some(vec!["storage.example".to_string()]),
        allow_private_networks: true,
        ..ReportFetcherConfig::default()
    })
    .unwrap();
    let outcome = listed.fetch(&format!("http://{addr}/report.json")).await;
    assert!(matches!(outcome, Err(ReportError::Policy { .. })));
}

#[tokio::test]
async fn report_redirects_are_refused() {
    let addr = start_stub().await;
    let fetcher = fetcher();
    let outcome = fetcher.fetch(&format!("http://{addr}/moved.json")).await;
    // Redirects are disabled, so the 307 surfaces as a status failure
    // rather than being followed to a new peer.
    assert!(matches!(
        outcome,
        Err(ReportError::Status {
            status: 307,
            ..
        })
    ));
}
