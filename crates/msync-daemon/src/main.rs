//! msync-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config,
//! builds the shared state, wires middleware, and starts the HTTP server
//! alongside the periodic sync task.  All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use msync_catalog::CatalogClient;
use msync_config::{load_layered_yaml, SyncSettings};
use msync_daemon::{routes, runner, state};
use msync_sheet::{parser::ParseConfig, GoogleSheetsSource};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let paths: Vec<&str> = if args.is_empty() {
        vec!["config/base.yaml"]
    } else {
        args.iter().map(String::as_str).collect()
    };

    let loaded = load_layered_yaml(&paths).context("config load failed")?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let settings = SyncSettings::from_config(&loaded)?;
    let api_key = settings.sheet_api_key()?;

    let source = GoogleSheetsSource::new_with_base_url(
        api_key,
        settings.sheet.spreadsheet_id.clone(),
        settings.sheet.range.clone(),
        settings.sheet.base_url.clone(),
    );
    let catalog = CatalogClient::new(settings.catalog.base_url.clone());
    let parse_cfg = ParseConfig::new(settings.images.base_url.clone());

    let shared = Arc::new(state::AppState::new(
        Arc::new(source),
        Arc::new(catalog),
        parse_cfg,
    ));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    runner::spawn_sync_tick(
        Arc::clone(&shared),
        Duration::from_secs(settings.scheduler.interval_secs),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = settings
        .daemon
        .bind_addr
        .parse()
        .with_context(|| format!("invalid daemon.bind_addr '{}'", settings.daemon.bind_addr))?;
    info!("msync-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
