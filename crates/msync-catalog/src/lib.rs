//! msync-catalog
//!
//! Catalog-side boundary: the [`Catalog`] trait carries exactly the
//! operations the reconciler needs, and [`CatalogClient`] is the HTTP
//! implementation against the catalog API. Each operation is one network
//! round trip with no implicit retry.
//!
//! ## Wire contract
//!
//! All bodies are JSON enveloped as `{ "success": bool, "data": ...,
//! "message": ... }`; failure carries `message`. Endpoints:
//!
//! - `GET  /search/restaurants?q=`        (find by name, fuzzy server-side)
//! - `POST /restaurants`                  (create)
//! - `PUT  /restaurants/{id}`             (update)
//! - `GET  /restaurants/{id}/menus`       (list menus)
//! - `POST /restaurants/{id}/menus`       (create menu)
//! - `POST /menus/{id}/items/bulk`        (bulk replace items)

use std::fmt;

use msync_schemas::{MenuItem, Restaurant};
use serde::{Deserialize, Serialize};

/// Canonical name used when a restaurant has no remote menu yet.
pub const MAIN_MENU_NAME: &str = "Main Menu";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure classes for catalog operations. `find_by_name` collapses all
/// of these into "not found"; the write operations propagate them.
#[derive(Debug)]
pub enum CatalogError {
    /// Network, DNS, or timeout failure.
    Transport(String),
    /// Non-JSON or unexpected-shape response.
    Decode(String),
    /// Well-formed response explicitly signaling non-success.
    Api { message: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Transport(msg) => write!(f, "transport error: {msg}"),
            CatalogError::Decode(msg) => write!(f, "decode error: {msg}"),
            CatalogError::Api { message } => write!(f, "catalog api error: {message}"),
        }
    }
}

impl std::error::Error for CatalogError {}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A restaurant as the catalog reports it. Only the fields the engine
/// relies on; the server may return more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRestaurant {
    pub id: String,
    pub name: String,
}

/// A menu container as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMenu {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self, status: reqwest::StatusCode) -> Result<T, CatalogError> {
        if !status.is_success() || !self.success {
            return Err(CatalogError::Api {
                message: self
                    .message
                    .unwrap_or_else(|| format!("http status {}", status.as_u16())),
            });
        }
        self.data
            .ok_or_else(|| CatalogError::Decode("success response without data".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct CreateMenuRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct BulkItemsRequest<'a> {
    items: &'a [MenuItem],
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// Remote catalog contract as the reconciler sees it.
///
/// Object-safe and `Send + Sync` so the engine can hold a
/// `&dyn Catalog` across await points.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Case-insensitive exact-name lookup. Any transport, decode, or
    /// application failure is treated as "not found": a false negative
    /// only risks a duplicate create, never data loss.
    async fn find_by_name(&self, name: &str) -> Option<RemoteRestaurant>;

    /// Create a restaurant. The server may assign its own id; the
    /// returned record is authoritative.
    async fn create(&self, restaurant: &Restaurant) -> Result<RemoteRestaurant, CatalogError>;

    /// Update the restaurant at `id` with the parsed record.
    async fn update(
        &self,
        id: &str,
        restaurant: &Restaurant,
    ) -> Result<RemoteRestaurant, CatalogError>;

    /// Return the restaurant's first menu id, creating a menu named
    /// [`MAIN_MENU_NAME`] only when none exist. First-menu-wins is
    /// deliberate: index 0 of the remote list, regardless of name.
    async fn list_or_create_main_menu(&self, restaurant_id: &str) -> Result<String, CatalogError>;

    /// Bulk-replace the menu's full item list.
    async fn replace_items(&self, menu_id: &str, items: &[MenuItem]) -> Result<(), CatalogError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Thin HTTP implementation of [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, CatalogError> {
        let status = resp.status();
        let env: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("catalog response decode failed: {e}")))?;
        env.into_data(status)
    }

    async fn search(&self, name: &str) -> Result<Vec<RemoteRestaurant>, CatalogError> {
        let resp = self
            .http
            .get(self.url("/search/restaurants"))
            .query(&[("q", name)])
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("search request failed: {e}")))?;
        Self::decode(resp).await
    }
}

#[async_trait::async_trait]
impl Catalog for CatalogClient {
    async fn find_by_name(&self, name: &str) -> Option<RemoteRestaurant> {
        // The search endpoint may return non-exact matches; filter
        // client-side. Failures collapse to None by contract.
        let results = self.search(name).await.ok()?;
        results
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    async fn create(&self, restaurant: &Restaurant) -> Result<RemoteRestaurant, CatalogError> {
        let resp = self
            .http
            .post(self.url("/restaurants"))
            .json(restaurant)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("create request failed: {e}")))?;
        Self::decode(resp).await
    }

    async fn update(
        &self,
        id: &str,
        restaurant: &Restaurant,
    ) -> Result<RemoteRestaurant, CatalogError> {
        let resp = self
            .http
            .put(self.url(&format!("/restaurants/{id}")))
            .json(restaurant)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("update request failed: {e}")))?;
        Self::decode(resp).await
    }

    async fn list_or_create_main_menu(&self, restaurant_id: &str) -> Result<String, CatalogError> {
        let resp = self
            .http
            .get(self.url(&format!("/restaurants/{restaurant_id}/menus")))
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("menu list request failed: {e}")))?;
        let menus: Vec<RemoteMenu> = Self::decode(resp).await?;

        if let Some(first) = menus.first() {
            return Ok(first.id.clone());
        }

        let resp = self
            .http
            .post(self.url(&format!("/restaurants/{restaurant_id}/menus")))
            .json(&CreateMenuRequest {
                name: MAIN_MENU_NAME,
            })
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("menu create request failed: {e}")))?;
        let menu: RemoteMenu = Self::decode(resp).await?;
        Ok(menu.id)
    }

    async fn replace_items(&self, menu_id: &str, items: &[MenuItem]) -> Result<(), CatalogError> {
        let resp = self
            .http
            .post(self.url(&format!("/menus/{menu_id}/items/bulk")))
            .json(&BulkItemsRequest { items })
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("bulk items request failed: {e}")))?;

        // The bulk endpoint's data payload is not used; only the envelope
        // success flag matters.
        let _: serde_json::Value = Self::decode(resp).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests (httpmock; no real network)
// ---------------------------------------------------------------------------
