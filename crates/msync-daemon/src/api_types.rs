//! Request and response types for all msync-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use serde::{Deserialize, Serialize};

use msync_reconcile::SyncReport;
use msync_schemas::Snapshot;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Run refusal (409)
// ---------------------------------------------------------------------------

/// Response body when a manual sync trigger is refused because a run is
/// already in flight. Runs are serialized; callers should poll status
/// and retry once the active run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRefusedResponse {
    pub error: String,
    /// Always "run_in_flight" today; kept as a field so the client can
    /// branch without parsing the message.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Run failure (502)
// ---------------------------------------------------------------------------

/// Response body when a manually triggered run aborts at the run level
/// (sheet unreachable, API error). Per-restaurant write failures do NOT
/// produce this; they appear inside the returned [`SyncReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailedResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Catalog read APIs
// ---------------------------------------------------------------------------

/// Last successfully parsed sheet snapshot (if any run has succeeded yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub has_snapshot: bool,
    pub snapshot: Option<Snapshot>,
}

/// Report from the most recent completed run (if any).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub has_report: bool,
    pub report: Option<SyncReport>,
}
