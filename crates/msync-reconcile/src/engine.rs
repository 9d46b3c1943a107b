use chrono::Utc;
use msync_catalog::Catalog;
use msync_schemas::{MenuItem, Restaurant, Snapshot};
use tracing::{info, warn};

use crate::{RestaurantFailure, RestaurantSynced, SyncAction, SyncReport, SyncStage};

/// Reconcile the catalog against one parsed snapshot.
///
/// Restaurants are processed sequentially in parser order. Per
/// restaurant:
/// 1. `find_by_name`: found routes to update, not-found to create.
/// 2. The effective remote id is the found id (update) or the
///    server-returned id (create); the locally derived id is discarded.
/// 3. `list_or_create_main_menu` on the effective id.
/// 4. `replace_items` when the restaurant's item list is non-empty.
///
/// A failure in steps 2-4 is recorded against that restaurant only and
/// the loop continues; the report carries both outcomes.
pub async fn reconcile(catalog: &dyn Catalog, snapshot: &Snapshot) -> SyncReport {
    let started_at_utc = Utc::now();
    let mut synced = Vec::new();
    let mut failures = Vec::new();

    for restaurant in &snapshot.restaurants {
        let items = snapshot.items_for(&restaurant.id);
        match sync_one(catalog, restaurant, items).await {
            Ok(outcome) => {
                info!(
                    restaurant = %outcome.name,
                    action = ?outcome.action,
                    items = outcome.items_submitted,
                    "restaurant synced"
                );
                synced.push(outcome);
            }
            Err((stage, message)) => {
                warn!(
                    restaurant = %restaurant.name,
                    stage = stage.as_str(),
                    %message,
                    "restaurant sync failed; continuing with the rest"
                );
                failures.push(RestaurantFailure {
                    name: restaurant.name.clone(),
                    stage,
                    message,
                });
            }
        }
    }

    SyncReport {
        started_at_utc,
        finished_at_utc: Utc::now(),
        synced,
        failures,
    }
}

/// The per-restaurant call sequence. Strictly ordered;
/// every await is a suspension point, nothing runs concurrently.
async fn sync_one(
    catalog: &dyn Catalog,
    restaurant: &Restaurant,
    items: &[MenuItem],
) -> Result<RestaurantSynced, (SyncStage, String)> {
    let (action, remote_id) = match catalog.find_by_name(&restaurant.name).await {
        Some(found) => {
            catalog
                .update(&found.id, restaurant)
                .await
                .map_err(|e| (SyncStage::Write, e.to_string()))?;
            (SyncAction::Updated, found.id)
        }
        None => {
            let created = catalog
                .create(restaurant)
                .await
                .map_err(|e| (SyncStage::Write, e.to_string()))?;
            (SyncAction::Created, created.id)
        }
    };

    let menu_id = catalog
        .list_or_create_main_menu(&remote_id)
        .await
        .map_err(|e| (SyncStage::MenuResolve, e.to_string()))?;

    if !items.is_empty() {
        catalog
            .replace_items(&menu_id, items)
            .await
            .map_err(|e| (SyncStage::ItemsReplace, e.to_string()))?;
    }

    Ok(RestaurantSynced {
        name: restaurant.name.clone(),
        action,
        remote_id,
        menu_id,
        items_submitted: items.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests (in-process mock catalog; no network)
// ---------------------------------------------------------------------------
