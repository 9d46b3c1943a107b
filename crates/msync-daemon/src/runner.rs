//! Sync run orchestration and the periodic scheduler task.
//!
//! One run = fetch table -> parse -> reconcile -> publish snapshot +
//! report. Runs are strictly serialized through the [`AppState`]
//! single-run guard: a tick or manual trigger observed while a run is
//! active is skipped/refused, never raced (concurrent menu
//! lookup-or-create could duplicate menus).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use msync_reconcile::SyncReport;
use msync_sheet::parser::parse_table;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::{AppState, BusMsg};

/// Run-level failures. Per-restaurant write failures are NOT here; they
/// live inside the report and never abort a run.
#[derive(Debug)]
pub enum RunError {
    /// Another run holds the single-run slot.
    AlreadyRunning,
    /// The sheet fetch failed; the previous snapshot stays in effect.
    SourceUnavailable(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::AlreadyRunning => write!(f, "a sync run is already in flight"),
            RunError::SourceUnavailable(msg) => write!(f, "sheet source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RunError {}

/// Execute one full sync run.
///
/// On success the parsed snapshot replaces the stored one and the report
/// is published. On source failure the run aborts, `last_error` is set,
/// and previously synced data is left untouched.
pub async fn run_sync(state: &Arc<AppState>) -> Result<SyncReport, RunError> {
    let _guard = state.try_begin_run().ok_or(RunError::AlreadyRunning)?;

    let run_id = Uuid::new_v4();
    set_running(state, run_id).await;
    info!(%run_id, source = state.source.name(), "sync run started");

    let table = match state.source.fetch_table().await {
        Ok(t) => t,
        Err(e) => {
            let msg = e.to_string();
            warn!(%run_id, error = %msg, "sync run aborted: source unavailable");
            finish_failed(state, &msg).await;
            return Err(RunError::SourceUnavailable(msg));
        }
    };

    let snapshot = parse_table(&table, &state.parse_cfg);
    let report = msync_reconcile::reconcile(state.catalog.as_ref(), &snapshot).await;

    info!(
        %run_id,
        restaurants = snapshot.restaurants.len(),
        items = snapshot.total_items(),
        synced = report.synced_count(),
        failed = report.failure_count(),
        "sync run finished"
    );

    // Publish: snapshot replacement is atomic from the readers' view.
    *state.snapshot.write().await = Some(snapshot);
    *state.report.write().await = Some(report.clone());
    finish_succeeded(state).await;

    Ok(report)
}

async fn set_running(state: &Arc<AppState>, run_id: Uuid) {
    let snap = {
        let mut s = state.status.write().await;
        s.state = "running".to_string();
        s.active_run_id = Some(run_id);
        s.daemon_uptime_secs = crate::state::uptime_secs();
        s.clone()
    };
    let _ = state.bus.send(BusMsg::Status(snap));
}

async fn finish_succeeded(state: &Arc<AppState>) {
    let snap = {
        let mut s = state.status.write().await;
        s.state = "idle".to_string();
        s.active_run_id = None;
        s.last_sync_utc = Some(Utc::now());
        s.last_error = None;
        s.runs_completed += 1;
        s.daemon_uptime_secs = crate::state::uptime_secs();
        s.clone()
    };
    let _ = state.bus.send(BusMsg::Status(snap));
}

async fn finish_failed(state: &Arc<AppState>, message: &str) {
    let snap = {
        let mut s = state.status.write().await;
        s.state = "idle".to_string();
        s.active_run_id = None;
        s.last_error = Some(message.to_string());
        s.daemon_uptime_secs = crate::state::uptime_secs();
        s.clone()
    };
    let _ = state.bus.send(BusMsg::Status(snap));
    let _ = state.bus.send(BusMsg::LogLine {
        level: "ERROR".to_string(),
        msg: format!("sync run failed: {message}"),
    });
}

/// Spawn the periodic scheduler: one run at startup, then one per
/// `interval`. A tick that lands while a run is still in flight is
/// skipped; the next tick supersedes it.
pub fn spawn_sync_tick(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            // First tick fires immediately: startup run.
            ticker.tick().await;
            match run_sync(&state).await {
                Ok(report) => {
                    if !report.is_clean() {
                        warn!(
                            failed = report.failure_count(),
                            "scheduled sync completed with per-restaurant failures"
                        );
                    }
                }
                Err(RunError::AlreadyRunning) => {
                    warn!("scheduled sync tick skipped: run already in flight");
                }
                Err(RunError::SourceUnavailable(_)) => {
                    // Already logged and recorded in status; the next
                    // tick is the retry.
                }
            }
        }
    });
}
