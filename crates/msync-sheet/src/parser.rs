//! Row Parser: raw sheet grid -> normalized [`Snapshot`].
//!
//! Pure transformation. No network, no global state; ids come from a
//! pass-local [`IdMint`], so the same input grid always parses to the
//! same snapshot.
//!
//! ## Column contract (positional)
//!
//! | Index | Cell                 | Notes                                  |
//! |-------|----------------------|----------------------------------------|
//! | 0     | restaurant name      | natural key; trimmed, then exact match |
//! | 1     | item name            |                                        |
//! | 2     | price                | opaque display string                  |
//! | 3     | item category        | fallback when blank                    |
//! | 4     | item description     | defaults to empty                      |
//! | 5     | item image reference | resolved under the image base URL      |
//! | 6     | availability flag    | `false` iff the cell is exactly `FALSE`|
//! | 7..   | optional: location, specialty, rating, restaurant image      |
//!
//! Row 0 is a header and is discarded unconditionally (never validated).
//! Rows with fewer than 7 cells are skipped, not fatal.

use std::collections::HashMap;

use msync_schemas::{MenuItem, Restaurant, Snapshot};

use crate::ident::IdMint;

pub const DEFAULT_LOCATION: &str = "Blantyre";
pub const DEFAULT_SPECIALTY: &str = "Local Cuisine";
pub const DEFAULT_CATEGORY: &str = "Main Dishes";
pub const DEFAULT_RATING: f64 = 4.5;
pub const PLACEHOLDER_IMAGE: &str = "placeholder.jpg";

/// Settings the parser needs from config: where item image references
/// resolve to.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub image_base_url: String,
}

impl ParseConfig {
    pub fn new(image_base_url: impl Into<String>) -> Self {
        Self {
            image_base_url: image_base_url.into(),
        }
    }

    fn resolve_image(&self, reference: &str) -> String {
        let base = self.image_base_url.trim_end_matches('/');
        let r = reference.trim();
        if r.is_empty() {
            format!("{base}/{PLACEHOLDER_IMAGE}")
        } else {
            format!("{base}/{r}")
        }
    }
}

/// Parse a raw grid into a snapshot.
///
/// - Fewer than 2 rows (header + at least one data row) yields an empty
///   snapshot, not an error.
/// - First occurrence of a restaurant name wins for restaurant-level
///   fields; later rows for the same name only contribute items.
pub fn parse_table(rows: &[Vec<String>], cfg: &ParseConfig) -> Snapshot {
    let mut snapshot = Snapshot::empty();
    if rows.len() < 2 {
        return snapshot;
    }

    let mut mint = IdMint::new();
    // Restaurant name -> index into snapshot.restaurants. Names are
    // trimmed of surrounding whitespace (sheet cells often carry
    // accidental padding); after that the match is exact and
    // case-preserving.
    let mut seen: HashMap<String, usize> = HashMap::new();

    for row in &rows[1..] {
        if row.len() < 7 {
            // Malformed row: skipped, never fatal.
            continue;
        }

        let name = row[0].trim().to_string();

        let idx = match seen.get(&name) {
            Some(&i) => i,
            None => {
                let restaurant = build_restaurant(&name, row, cfg, &mut mint);
                snapshot
                    .items_by_restaurant
                    .insert(restaurant.id.clone(), Vec::new());
                snapshot.restaurants.push(restaurant);
                let i = snapshot.restaurants.len() - 1;
                seen.insert(name.clone(), i);
                i
            }
        };

        let restaurant_id = snapshot.restaurants[idx].id.clone();
        let item = build_item(row, &name, cfg, &mut mint);
        if let Some(items) = snapshot.items_by_restaurant.get_mut(&restaurant_id) {
            items.push(item);
        }
    }

    snapshot
}

fn build_restaurant(
    name: &str,
    row: &[String],
    cfg: &ParseConfig,
    mint: &mut IdMint,
) -> Restaurant {
    let location = opt_cell(row, 7).unwrap_or(DEFAULT_LOCATION.to_string());
    let specialty = opt_cell(row, 8).unwrap_or(DEFAULT_SPECIALTY.to_string());
    let rating = opt_cell(row, 9)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(DEFAULT_RATING);
    let image = opt_cell(row, 10).unwrap_or_else(|| cfg.resolve_image(""));

    Restaurant {
        id: mint.mint(name),
        name: name.to_string(),
        location,
        specialty,
        rating,
        image,
    }
}

fn build_item(row: &[String], restaurant_name: &str, cfg: &ParseConfig, mint: &mut IdMint) -> MenuItem {
    let item_name = row[1].trim().to_string();
    let category = opt_cell(row, 3).unwrap_or(DEFAULT_CATEGORY.to_string());

    // Item ids derive from item name + restaurant name so the same dish
    // in two restaurants never collides.
    let id = mint.mint(&format!("{item_name}{restaurant_name}"));

    MenuItem {
        id,
        name: item_name,
        price: row[2].trim().to_string(),
        category,
        description: opt_cell(row, 4).unwrap_or_default(),
        image: cfg.resolve_image(&row[5]),
        // Absence of the column means available; only the exact literal
        // "FALSE" marks an item unavailable.
        available: row[6] != "FALSE",
    }
}

/// Trimmed cell at `i`, `None` when missing or blank.
fn opt_cell(row: &[String], i: usize) -> Option<String> {
    row.get(i)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
