//! msync-sheet
//!
//! Sheet-side boundary of the sync pipeline: the source abstraction, the
//! Google Sheets HTTP source, the row parser, and derived-identity
//! minting. This crate never talks to the catalog; callers hand the
//! parsed [`msync_schemas::Snapshot`] to the reconciler.

pub mod ident;
pub mod parser;

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SheetSource`] implementation may return. The caller treats
/// every variant as "source unavailable" for the run: the run aborts and
/// the previous snapshot stays in effect.
#[derive(Debug)]
pub enum SourceError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Api {
                code: Some(c),
                message,
            } => write!(f, "sheet api error code={c}: {message}"),
            SourceError::Api {
                code: None,
                message,
            } => write!(f, "sheet api error: {message}"),
            SourceError::Decode(msg) => write!(f, "decode error: {msg}"),
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Upstream tabular source contract.
///
/// Object-safe so callers can hold a `Box<dyn SheetSource>`; `Send + Sync`
/// so sources cross async task boundaries.
#[async_trait::async_trait]
pub trait SheetSource: Send + Sync {
    /// Human-readable name identifying this source (e.g. `"google-sheets"`).
    fn name(&self) -> &'static str;

    /// Fetch the raw grid: a rectangular table of cell strings, first row
    /// header. Rows may be ragged; the parser handles short rows.
    async fn fetch_table(&self) -> Result<Vec<Vec<String>>, SourceError>;
}

// ---------------------------------------------------------------------------
// Google Sheets source
// ---------------------------------------------------------------------------

/// Range-qualified values fetch against the Google Sheets API.
///
/// API key is read by the caller (from the env var named in config) and
/// passed in; do not log it.
#[derive(Debug, Clone)]
pub struct GoogleSheetsSource {
    api_key: String,
    spreadsheet_id: String,
    range: String,
    http: reqwest::Client,
    base_url: String,
}

impl GoogleSheetsSource {
    pub fn new(api_key: String, spreadsheet_id: String, range: String) -> Self {
        Self::new_with_base_url(
            api_key,
            spreadsheet_id,
            range,
            "https://sheets.googleapis.com".to_string(),
        )
    }

    pub fn new_with_base_url(
        api_key: String,
        spreadsheet_id: String,
        range: String,
        base_url: String,
    ) -> Self {
        Self {
            api_key,
            spreadsheet_id,
            range,
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            self.range
        )
    }
}

#[async_trait::async_trait]
impl SheetSource for GoogleSheetsSource {
    fn name(&self) -> &'static str {
        "google-sheets"
    }

    async fn fetch_table(&self) -> Result<Vec<Vec<String>>, SourceError> {
        if self.api_key.trim().is_empty() {
            return Err(SourceError::Config("sheet api key is empty".to_string()));
        }

        let resp = self
            .http
            .get(self.values_url())
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("sheets request failed: {e}")))?;

        let status = resp.status();
        let body: ValuesResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("sheets response json decode failed: {e}")))?;

        if !status.is_success() {
            let (code, message) = body.error_parts();
            return Err(SourceError::Api { code, message });
        }

        Ok(body.values.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Option<Vec<Vec<String>>>,
    #[serde(default)]
    error: Option<ValuesError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ValuesError {
    code: Option<i64>,
    message: Option<String>,
}

impl ValuesResponse {
    fn error_parts(&self) -> (Option<i64>, String) {
        match &self.error {
            Some(e) => (
                e.code,
                e.message.clone().unwrap_or_else(|| "unknown".to_string()),
            ),
            None => (None, "unknown".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests (httpmock; no real network)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source(server: &MockServer) -> GoogleSheetsSource {
        GoogleSheetsSource::new_with_base_url(
            "test-key".to_string(),
            "sheet-123".to_string(),
            "Menu!A1:K200".to_string(),
            server.base_url(),
        )
    }

    #[tokio::test]
    async fn fetch_table_decodes_values_grid() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v4/spreadsheets/sheet-123/values/Menu!A1:K200")
                    .query_param("key", "test-key");
                then.status(200).json_body(serde_json::json!({
                    "range": "Menu!A1:K200",
                    "majorDimension": "ROWS",
                    "values": [
                        ["Restaurant", "Item", "Price"],
                        ["Mama's Kitchen", "Nsima", "MK 1,500", "Main Dishes", "", "", ""]
                    ]
                }));
            })
            .await;

        let grid = source(&server).fetch_table().await.unwrap();
        mock.assert_async().await;
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1][0], "Mama's Kitchen");
    }

    #[tokio::test]
    async fn missing_values_field_yields_empty_grid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200)
                    .json_body(serde_json::json!({ "range": "Menu!A1:K200" }));
            })
            .await;

        let grid = source(&server).fetch_table().await.unwrap();
        assert!(grid.is_empty());
    }

    #[tokio::test]
    async fn api_error_surfaces_code_and_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(403).json_body(serde_json::json!({
                    "error": { "code": 403, "message": "The caller does not have permission" }
                }));
            })
            .await;

        let err = source(&server).fetch_table().await.unwrap_err();
        match err {
            SourceError::Api { code, message } => {
                assert_eq!(code, Some(403));
                assert!(message.contains("permission"));
            }
            other => panic!("expected Api error, got {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let err = source(&server).fetch_table().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_api_key_refused_before_any_request() {
        let server = MockServer::start_async().await;
        let src = GoogleSheetsSource::new_with_base_url(
            "".to_string(),
            "sheet-123".to_string(),
            "Menu!A1:K200".to_string(),
            server.base_url(),
        );
        let err = src.fetch_table().await.unwrap_err();
        assert!(matches!(err, SourceError::Config(_)));
    }

    #[test]
    fn source_error_display_variants() {
        let api = SourceError::Api {
            code: Some(429),
            message: "rate limited".to_string(),
        };
        assert_eq!(api.to_string(), "sheet api error code=429: rate limited");

        let t = SourceError::Transport("connection refused".to_string());
        assert!(t.to_string().contains("connection refused"));
    }
}
