//! msync-schemas
//!
//! Shared domain types for the menu synchronization pipeline. Pure data:
//! no IO, no parsing logic, no network types. Every other crate in the
//! workspace consumes these.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A restaurant record as parsed from one sheet pass.
///
/// `name` is the natural key used for remote matching. `id` is a locally
/// derived correlation key valid only within the pass that produced it;
/// the catalog's server-assigned id is authoritative after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub location: String,
    pub specialty: String,
    pub rating: f64,
    pub image: String,
}

/// A single menu item belonging to one restaurant.
///
/// `price` stays an opaque display string (e.g. `"MK 1,500"`); no
/// arithmetic is ever performed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub description: String,
    pub image: String,
    pub available: bool,
}

/// The result of one parse pass over the sheet: restaurants in first-seen
/// order plus each restaurant's item list keyed by its derived id.
///
/// A snapshot is created per sync invocation, replaces the previous one
/// entirely, and is discarded when superseded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub restaurants: Vec<Restaurant>,
    pub items_by_restaurant: BTreeMap<String, Vec<MenuItem>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    /// Items for a given restaurant id; empty slice when none were parsed.
    pub fn items_for(&self, restaurant_id: &str) -> &[MenuItem] {
        self.items_by_restaurant
            .get(restaurant_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_items(&self) -> usize {
        self.items_by_restaurant.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            name: "Nsima".to_string(),
            price: "MK 1,500".to_string(),
            category: "Main Dishes".to_string(),
            description: String::new(),
            image: "https://img.example/placeholder.jpg".to_string(),
            available: true,
        }
    }

    #[test]
    fn empty_snapshot_has_no_items() {
        let s = Snapshot::empty();
        assert!(s.is_empty());
        assert_eq!(s.total_items(), 0);
        assert!(s.items_for("anything").is_empty());
    }

    #[test]
    fn total_items_sums_across_restaurants() {
        let mut s = Snapshot::empty();
        s.items_by_restaurant
            .insert("r1".to_string(), vec![item("a"), item("b")]);
        s.items_by_restaurant.insert("r2".to_string(), vec![item("c")]);
        assert_eq!(s.total_items(), 3);
        assert_eq!(s.items_for("r1").len(), 2);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut s = Snapshot::empty();
        s.restaurants.push(Restaurant {
            id: "mamaskitchen-0".to_string(),
            name: "Mama's Kitchen".to_string(),
            location: "Blantyre".to_string(),
            specialty: "Traditional".to_string(),
            rating: 4.8,
            image: "https://img.example/placeholder.jpg".to_string(),
        });
        s.items_by_restaurant
            .insert("mamaskitchen-0".to_string(), vec![item("nsima-1")]);

        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
