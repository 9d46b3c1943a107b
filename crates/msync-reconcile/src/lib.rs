//! msync-reconcile
//!
//! Reconciliation Engine: brings the remote catalog into agreement with a
//! freshly parsed snapshot.
//!
//! Architectural decisions:
//! - Name-keyed upsert: find-by-name decides create vs. update
//! - Dependent-resource sequencing: restaurant -> menu -> items
//! - Bulk item replacement, never incremental merge
//! - Per-restaurant failure isolation; a failure never aborts the run
//! - Strictly sequential: menu lookup-or-create is not safe to race
//!
//! Network access goes through the [`msync_catalog::Catalog`] trait; the
//! engine itself holds no HTTP state.

mod engine;
mod types;

pub use engine::reconcile;
pub use types::*;
