//! VetTrack server - Main entry point
//!
//! Pet health records, AI symptom checks, reminders and video consultations
//! behind a JSON API.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vettrack_common::config::{ConfigOverrides, ServiceConfig};
use vettrack_common::db::init_database;
use vettrack_server::services::reminder_scanner::spawn_reminder_scanner;
use vettrack_server::{build_router, AppState};

/// Command-line arguments for vettrack
#[derive(Parser, Debug)]
#[command(name = "vettrack")]
#[command(about = "Pet health tracking service")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "VETTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database and uploads
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vettrack_server=info,vettrack_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting VetTrack server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let overrides = ConfigOverrides {
        config_file: args.config,
        root_folder: args.root_folder,
        bind_address: args.bind,
        port: args.port,
    };

    let config = ServiceConfig::resolve(&overrides).context("Failed to resolve configuration")?;
    config
        .ensure_directories()
        .context("Failed to create data directories")?;
    info!("Root folder: {}", config.root_folder.display());

    let pool = init_database(&config.database_path())
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    if config.gemini.api_key.is_none() {
        info!("GEMINI_API_KEY not set; AI analysis will return fallback results");
    }
    if config.murf.api_key.is_none() {
        info!("MURF_API_KEY not set; speech synthesis disabled");
    }

    let scan_interval = Duration::from_secs(config.reminder_scan_interval_secs);
    let addr = format!("{}:{}", config.bind_address, config.port);

    let state = AppState::new(pool.clone(), config).context("Failed to build application state")?;
    spawn_reminder_scanner(pool, state.event_bus.clone(), scan_interval);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("vettrack listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
