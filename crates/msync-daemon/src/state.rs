//! Shared runtime state for msync-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async
//! itself beyond the background tasks it spawns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use msync_catalog::Catalog;
use msync_reconcile::SyncReport;
use msync_schemas::Snapshot;
use msync_sheet::parser::ParseConfig;
use msync_sheet::SheetSource;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(StatusSnapshot),
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of the sync lifecycle, returned by GET /v1/status
/// and carried inside SSE `status` events. This is the whole observable
/// surface the presentation layer consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    /// "idle" | "running"
    pub state: String,
    pub active_run_id: Option<Uuid>,
    /// Timestamp of the last run that completed without a run-level error.
    pub last_sync_utc: Option<DateTime<Utc>>,
    /// Message from the last failed run; cleared by the next success.
    pub last_error: Option<String>,
    pub runs_completed: u64,
}

impl StatusSnapshot {
    fn boot() -> Self {
        Self {
            daemon_uptime_secs: uptime_secs(),
            state: "idle".to_string(),
            active_run_id: None,
            last_sync_utc: None,
            last_error: None,
            runs_completed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers and the
/// scheduler task.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Mutable run/status state.
    pub status: Arc<RwLock<StatusSnapshot>>,
    /// Last successfully parsed snapshot. Replaced only on success; a
    /// failed run never clears it.
    pub snapshot: Arc<RwLock<Option<Snapshot>>>,
    /// Report from the most recent completed run.
    pub report: Arc<RwLock<Option<SyncReport>>>,
    /// Sheet-side source for runs.
    pub source: Arc<dyn SheetSource>,
    /// Catalog-side client for runs.
    pub catalog: Arc<dyn Catalog>,
    /// Image resolution settings handed to the parser.
    pub parse_cfg: ParseConfig,
    /// Single-run guard: set while a run is in flight so overlapping
    /// triggers are refused instead of racing the catalog.
    in_flight: AtomicBool,
}

impl AppState {
    pub fn new(
        source: Arc<dyn SheetSource>,
        catalog: Arc<dyn Catalog>,
        parse_cfg: ParseConfig,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "msync-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            status: Arc::new(RwLock::new(StatusSnapshot::boot())),
            snapshot: Arc::new(RwLock::new(None)),
            report: Arc::new(RwLock::new(None)),
            source,
            catalog,
            parse_cfg,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Claim the single-run slot. Returns `None` when a run is already
    /// in flight; the returned guard releases the slot on drop.
    pub fn try_begin_run(self: &Arc<Self>) -> Option<RunGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(RunGuard {
                state: Arc::clone(self),
            })
        } else {
            None
        }
    }

    pub fn run_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the single-run slot when the run finishes, including on
/// panic or early return.
pub struct RunGuard {
    state: Arc<AppState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.in_flight.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
