//! Scenario: a failed fetch never clears previously synced data.
//!
//! First run succeeds and publishes a snapshot. The source then starts
//! failing; a manual trigger must return `502`, record `last_error`,
//! and leave the earlier snapshot, report, and catalog contents intact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use msync_daemon::{routes, state};
use msync_sheet::parser::ParseConfig;
use msync_sheet::{SheetSource, SourceError};
use msync_testkit::MemoryCatalog;
use tower::ServiceExt; // oneshot

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

/// First fetch succeeds, every later fetch fails with a transport error.
struct FlakySource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SheetSource for FlakySource {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch_table(&self) -> Result<Vec<Vec<String>>, SourceError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            // Columns: name, item, price, category, description, image,
            // available, then optional location.
            Ok(vec![
                vec!["h".to_string(); 7],
                vec![
                    "Lakeside Cafe".to_string(),
                    "Chambo Fillet".to_string(),
                    "MK 6,000".to_string(),
                    "Fish".to_string(),
                    "".to_string(),
                    "".to_string(),
                    "".to_string(),
                    "Mangochi".to_string(),
                ],
            ])
        } else {
            Err(SourceError::Transport("connection reset".to_string()))
        }
    }
}

#[tokio::test]
async fn failed_fetch_keeps_previous_snapshot_and_report() {
    let catalog = Arc::new(MemoryCatalog::new());
    let st = Arc::new(state::AppState::new(
        Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        }),
        Arc::clone(&catalog) as Arc<dyn msync_catalog::Catalog>,
        ParseConfig::new("https://img.example.com"),
    ));
    let router = routes::build_router(Arc::clone(&st));

    // Run 1: succeeds, publishes snapshot.
    let (status, _) = call(router.clone(), post("/v1/sync/run")).await;
    assert_eq!(status, StatusCode::OK);

    // Run 2: source down, 502 with an error body.
    let (status, body) = call(router.clone(), post("/v1/sync/run")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json = parse_json(body);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));

    // Snapshot and report from run 1 survive untouched.
    let (_, body) = call(router.clone(), get("/v1/snapshot")).await;
    let json = parse_json(body);
    assert_eq!(json["has_snapshot"], true);
    let r = &json["snapshot"]["restaurants"][0];
    assert_eq!(r["name"], "Lakeside Cafe");
    assert_eq!(r["location"], "Mangochi");
    let rid = r["id"].as_str().unwrap();
    let items = json["snapshot"]["items_by_restaurant"][rid].as_array().unwrap();
    assert_eq!(items[0]["name"], "Chambo Fillet");
    assert_eq!(items[0]["price"], "MK 6,000");

    let (_, body) = call(router.clone(), get("/v1/report")).await;
    let json = parse_json(body);
    assert_eq!(json["has_report"], true);
    assert_eq!(json["report"]["failures"].as_array().unwrap().len(), 0);

    // Status records the failure but keeps the success history.
    let (_, body) = call(router, get("/v1/status")).await;
    let json = parse_json(body);
    assert_eq!(json["state"], "idle");
    assert_eq!(json["runs_completed"], 1);
    assert!(json["last_sync_utc"].is_string());
    assert!(json["last_error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));

    // Catalog contents from run 1 also survive.
    assert_eq!(catalog.restaurant_count(), 1);
}
