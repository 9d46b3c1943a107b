use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the engine did with one restaurant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
}

/// Where a restaurant's sync sequence failed. Lookup is absent by
/// design: a failed lookup is "not found", which routes to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// create or update of the restaurant record
    Write,
    /// menu list-or-create
    MenuResolve,
    /// bulk item replacement
    ItemsReplace,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Write => "write",
            SyncStage::MenuResolve => "menu_resolve",
            SyncStage::ItemsReplace => "items_replace",
        }
    }
}

/// One restaurant synced to completion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSynced {
    pub name: String,
    pub action: SyncAction,
    /// The id-of-record: the catalog's id after create/update, never the
    /// locally derived one.
    pub remote_id: String,
    pub menu_id: String,
    pub items_submitted: usize,
}

/// One restaurant that failed, recorded against that restaurant only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestaurantFailure {
    pub name: String,
    pub stage: SyncStage,
    pub message: String,
}

/// Per-run summary of created/updated/failed restaurants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub synced: Vec<RestaurantSynced>,
    pub failures: Vec<RestaurantFailure>,
}

impl SyncReport {
    pub fn synced_count(&self) -> usize {
        self.synced.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn created_count(&self) -> usize {
        self.synced
            .iter()
            .filter(|s| s.action == SyncAction::Created)
            .count()
    }

    pub fn updated_count(&self) -> usize {
        self.synced
            .iter()
            .filter(|s| s.action == SyncAction::Updated)
            .count()
    }
}
