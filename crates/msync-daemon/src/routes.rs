//! Axum router and all HTTP handlers for msync-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        HealthResponse, ReportResponse, RunFailedResponse, RunRefusedResponse, SnapshotResponse,
    },
    runner::{run_sync, RunError},
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/snapshot", get(snapshot_handler))
        .route("/v1/report", get(report_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/sync/run", post(sync_run))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();

    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/snapshot
// ---------------------------------------------------------------------------

pub(crate) async fn snapshot_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = st.snapshot.read().await.clone();
    (
        StatusCode::OK,
        Json(SnapshotResponse {
            has_snapshot: snapshot.is_some(),
            snapshot,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/report
// ---------------------------------------------------------------------------

pub(crate) async fn report_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let report = st.report.read().await.clone();
    (
        StatusCode::OK,
        Json(ReportResponse {
            has_report: report.is_some(),
            report,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/sync/run
// ---------------------------------------------------------------------------

/// Trigger a sync run immediately, outside the schedule.
///
/// Returns `409 Conflict` if a run is already in flight: runs are
/// serialized so two passes never race the catalog's menu
/// lookup-or-create. Returns `502 Bad Gateway` when the run aborts at
/// the run level (sheet unreachable); the previous snapshot stays in
/// effect.
pub(crate) async fn sync_run(State(st): State<Arc<AppState>>) -> Response {
    if st.run_in_flight() {
        return (
            StatusCode::CONFLICT,
            Json(RunRefusedResponse {
                error: "RUN_REFUSED: a sync run is already in flight".to_string(),
                reason: "run_in_flight".to_string(),
            }),
        )
            .into_response();
    }

    match run_sync(&st).await {
        Ok(report) => {
            info!(
                synced = report.synced_count(),
                failed = report.failure_count(),
                "sync/run"
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        // Lost the race between the check above and the guard claim.
        Err(RunError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(RunRefusedResponse {
                error: "RUN_REFUSED: a sync run is already in flight".to_string(),
                reason: "run_in_flight".to_string(),
            }),
        )
            .into_response(),
        Err(RunError::SourceUnavailable(msg)) => (
            StatusCode::BAD_GATEWAY,
            Json(RunFailedResponse {
                error: format!("RUN_FAILED: {msg}"),
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
