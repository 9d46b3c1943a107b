use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;

use msync_catalog::CatalogClient;
use msync_config::{load_layered_yaml, SyncSettings};
use msync_sheet::parser::{parse_table, ParseConfig};
use msync_sheet::{GoogleSheetsSource, SheetSource};

#[derive(Parser)]
#[command(name = "msync")]
#[command(about = "Menu sync CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a local grid file (JSON array of rows) and print the snapshot
    Parse {
        /// Path to a JSON file holding the raw grid: [[cell, ...], ...]
        #[arg(long)]
        file: String,

        /// Base URL prepended to relative image filenames
        #[arg(long, default_value = "")]
        image_base_url: String,
    },

    /// Run one full sync pass (fetch -> parse -> reconcile) and print the report
    Sync {
        /// Layered config paths in merge order (base -> env -> local)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; silent when absent.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Parse {
            file,
            image_base_url,
        } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read grid file failed: {}", file))?;
            let rows: Vec<Vec<String>> =
                serde_json::from_str(&raw).context("grid file must be a JSON array of rows")?;

            let snapshot = parse_table(&rows, &ParseConfig::new(image_base_url));
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Sync { config_paths } => {
            let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            let settings = SyncSettings::from_config(&loaded)?;
            let api_key = settings.sheet_api_key()?;

            tracing::info!(config_hash = %loaded.config_hash, "one-shot sync");

            let source = GoogleSheetsSource::new_with_base_url(
                api_key,
                settings.sheet.spreadsheet_id.clone(),
                settings.sheet.range.clone(),
                settings.sheet.base_url.clone(),
            );
            let catalog = CatalogClient::new(settings.catalog.base_url.clone());
            let parse_cfg = ParseConfig::new(settings.images.base_url.clone());

            let table = source
                .fetch_table()
                .await
                .map_err(|e| anyhow::anyhow!("sheet fetch failed: {e}"))?;
            let snapshot = parse_table(&table, &parse_cfg);
            let report = msync_reconcile::reconcile(&catalog, &snapshot).await;

            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.is_clean() {
                anyhow::bail!(
                    "sync completed with {} restaurant failure(s)",
                    report.failure_count()
                );
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
