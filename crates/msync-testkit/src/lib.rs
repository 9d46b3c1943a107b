//! msync-testkit
//!
//! In-process stand-in for the remote catalog, used by the end-to-end
//! scenario tests under `tests/`. [`MemoryCatalog`] implements the real
//! [`msync_catalog::Catalog`] trait over in-memory maps, assigns its own
//! authoritative ids on create (like the real service), and supports
//! scripted failure injection per restaurant.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use msync_catalog::{Catalog, CatalogError, RemoteMenu, RemoteRestaurant, MAIN_MENU_NAME};
use msync_schemas::{MenuItem, Restaurant};

#[derive(Default)]
struct Store {
    /// Server id -> last written restaurant payload.
    restaurants: HashMap<String, Restaurant>,
    /// Server id -> display name (for case-insensitive search).
    names: HashMap<String, String>,
    /// Restaurant server id -> menus.
    menus: HashMap<String, Vec<RemoteMenu>>,
    /// Menu id -> current item list (bulk-replaced).
    items: HashMap<String, Vec<MenuItem>>,
    /// Menu id -> owning restaurant name (for failure injection).
    menu_owner: HashMap<String, String>,
    next_id: u64,
}

impl Store {
    fn mint_id(&mut self, prefix: &str) -> String {
        let n = self.next_id;
        self.next_id += 1;
        format!("{prefix}-{n}")
    }
}

/// In-memory catalog double. All state behind one mutex; methods never
/// hold the lock across an await.
#[derive(Default)]
pub struct MemoryCatalog {
    store: Mutex<Store>,
    fail_bulk_for: Mutex<HashSet<String>>,
    fail_create_for: Mutex<HashSet<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `replace_items` fail for menus owned by this restaurant name.
    pub fn fail_bulk_replace_for(&self, restaurant_name: &str) {
        self.fail_bulk_for
            .lock()
            .unwrap()
            .insert(restaurant_name.to_string());
    }

    /// Make `create` fail for this restaurant name.
    pub fn fail_create_for(&self, restaurant_name: &str) {
        self.fail_create_for
            .lock()
            .unwrap()
            .insert(restaurant_name.to_string());
    }

    pub fn restaurant_count(&self) -> usize {
        self.store.lock().unwrap().restaurants.len()
    }

    /// Server id of the restaurant with this exact name, if stored.
    pub fn id_of(&self, name: &str) -> Option<String> {
        let store = self.store.lock().unwrap();
        store
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone())
    }

    pub fn menus_of(&self, restaurant_id: &str) -> Vec<RemoteMenu> {
        self.store
            .lock()
            .unwrap()
            .menus
            .get(restaurant_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn items_in_menu(&self, menu_id: &str) -> Vec<MenuItem> {
        self.store
            .lock()
            .unwrap()
            .items
            .get(menu_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stored_restaurant(&self, restaurant_id: &str) -> Option<Restaurant> {
        self.store
            .lock()
            .unwrap()
            .restaurants
            .get(restaurant_id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn find_by_name(&self, name: &str) -> Option<RemoteRestaurant> {
        let store = self.store.lock().unwrap();
        store
            .names
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, n)| RemoteRestaurant {
                id: id.clone(),
                name: n.clone(),
            })
    }

    async fn create(&self, restaurant: &Restaurant) -> Result<RemoteRestaurant, CatalogError> {
        if self.fail_create_for.lock().unwrap().contains(&restaurant.name) {
            return Err(CatalogError::Api {
                message: format!("create refused for '{}'", restaurant.name),
            });
        }
        let mut store = self.store.lock().unwrap();
        // The catalog assigns its own id; the proposed one is ignored.
        let id = store.mint_id("cat");
        store.restaurants.insert(id.clone(), restaurant.clone());
        store.names.insert(id.clone(), restaurant.name.clone());
        Ok(RemoteRestaurant {
            id,
            name: restaurant.name.clone(),
        })
    }

    async fn update(
        &self,
        id: &str,
        restaurant: &Restaurant,
    ) -> Result<RemoteRestaurant, CatalogError> {
        let mut store = self.store.lock().unwrap();
        if !store.restaurants.contains_key(id) {
            return Err(CatalogError::Api {
                message: format!("no restaurant with id '{id}'"),
            });
        }
        store.restaurants.insert(id.to_string(), restaurant.clone());
        store.names.insert(id.to_string(), restaurant.name.clone());
        Ok(RemoteRestaurant {
            id: id.to_string(),
            name: restaurant.name.clone(),
        })
    }

    async fn list_or_create_main_menu(&self, restaurant_id: &str) -> Result<String, CatalogError> {
        let mut store = self.store.lock().unwrap();
        if !store.restaurants.contains_key(restaurant_id) {
            return Err(CatalogError::Api {
                message: format!("no restaurant with id '{restaurant_id}'"),
            });
        }
        if let Some(first) = store
            .menus
            .get(restaurant_id)
            .and_then(|menus| menus.first())
        {
            return Ok(first.id.clone());
        }

        let owner = store
            .names
            .get(restaurant_id)
            .cloned()
            .unwrap_or_default();
        let menu_id = store.mint_id("menu");
        store
            .menus
            .entry(restaurant_id.to_string())
            .or_default()
            .push(RemoteMenu {
                id: menu_id.clone(),
                name: MAIN_MENU_NAME.to_string(),
            });
        store.menu_owner.insert(menu_id.clone(), owner);
        Ok(menu_id)
    }

    async fn replace_items(&self, menu_id: &str, items: &[MenuItem]) -> Result<(), CatalogError> {
        let owner = self
            .store
            .lock()
            .unwrap()
            .menu_owner
            .get(menu_id)
            .cloned()
            .unwrap_or_default();
        if self.fail_bulk_for.lock().unwrap().contains(&owner) {
            return Err(CatalogError::Api {
                message: format!("bulk replace refused for '{owner}'"),
            });
        }
        let mut store = self.store.lock().unwrap();
        if !store.menu_owner.contains_key(menu_id) {
            return Err(CatalogError::Api {
                message: format!("no menu with id '{menu_id}'"),
            });
        }
        store.items.insert(menu_id.to_string(), items.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str) -> Restaurant {
        Restaurant {
            id: "local-0".to_string(),
            name: name.to_string(),
            location: "Blantyre".to_string(),
            specialty: "Local Cuisine".to_string(),
            rating: 4.5,
            image: "https://img.example/placeholder.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_catalog_id() {
        let catalog = MemoryCatalog::new();
        let created = catalog.create(&restaurant("Cafe Uno")).await.unwrap();
        assert_ne!(created.id, "local-0");
        assert_eq!(catalog.restaurant_count(), 1);
    }

    #[tokio::test]
    async fn find_is_case_insensitive_exact() {
        let catalog = MemoryCatalog::new();
        catalog.create(&restaurant("Cafe Uno")).await.unwrap();

        assert!(catalog.find_by_name("CAFE UNO").await.is_some());
        assert!(catalog.find_by_name("Cafe").await.is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_refused() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .update("missing", &restaurant("Cafe Uno"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Api { .. }));
    }

    #[tokio::test]
    async fn menu_created_once_then_reused() {
        let catalog = MemoryCatalog::new();
        let created = catalog.create(&restaurant("Cafe Uno")).await.unwrap();

        let m1 = catalog.list_or_create_main_menu(&created.id).await.unwrap();
        let m2 = catalog.list_or_create_main_menu(&created.id).await.unwrap();
        assert_eq!(m1, m2);
        assert_eq!(catalog.menus_of(&created.id).len(), 1);
    }
}
