//! wrrl-ld (Ledger Daemon) - Rights & Royalty Ledger service
//!
//! Hosts the shared rights/royalty ledger: song and rights-split registry,
//! royalty payment and distribution engine, usage oracle, and license
//! catalog, all behind one totally ordered command journal. State is
//! rebuilt from the journal at startup; the HTTP surface submits commands
//! and reads the in-memory snapshot.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

use wrrl_common::api::auth::load_shared_secret;
use wrrl_common::config::{RootFolderInitializer, RootFolderResolver};
use wrrl_common::db::{get_setting, init_database, load_or_init_bootstrap_admin};
use wrrl_ld::ledger::Ledger;
use wrrl_ld::{build_router, db, AppState};

/// Command-line arguments for wrrl-ld
#[derive(Parser, Debug)]
#[command(name = "wrrl-ld")]
#[command(about = "Rights & Royalty Ledger daemon for WRRL")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5726", env = "WRRL_LD_PORT")]
    port: u16,

    /// Root folder holding wrrl.db (falls back to WRRL_ROOT, TOML config,
    /// then the platform default)
    #[arg(short, long, env = "WRRL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap administrator identity, pinned in the database at first
    /// init; ignored (with a warning) once a database has one
    #[arg(short, long, env = "WRRL_BOOTSTRAP_ADMIN")]
    bootstrap_admin: Option<Uuid>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init, before any
    // database delays
    info!(
        "Starting WRRL Ledger Daemon (wrrl-ld) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    // Zero-config startup: CLI argument > environment > TOML > default
    let resolver = RootFolderResolver::new("ledger-daemon");
    let root_folder = args.root_folder.clone().unwrap_or_else(|| resolver.resolve());

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // Shared secret for API authentication (generated and stored on first
    // run; 0 disables auth)
    let shared_secret = load_shared_secret(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load shared secret: {}", e))?;
    if shared_secret == 0 {
        warn!("API authentication disabled (shared_secret = 0)");
    } else {
        info!("✓ Loaded shared secret for API authentication");
    }

    // The bootstrap administrator pins itself in settings on first init;
    // CLI/env takes precedence over the TOML config for the initial value
    let configured_admin = args
        .bootstrap_admin
        .or_else(|| resolver.load_toml_config().and_then(|c| c.bootstrap_admin));
    let bootstrap_admin = load_or_init_bootstrap_admin(&pool, configured_admin)
        .await
        .context("Failed to load bootstrap administrator")?;

    let max_body_bytes: usize = get_setting(&pool, "http_max_body_size_bytes")
        .await?
        .unwrap_or(1_048_576);
    let journal_browse_max_limit: u32 = get_setting(&pool, "journal_browse_max_limit")
        .await?
        .unwrap_or(500);

    // Rebuild ledger state by replaying the command journal in seq order.
    // Rejected commands are part of the history and reject again here.
    let mut ledger = Ledger::new(bootstrap_admin);
    let history = db::load_all(&pool)
        .await
        .context("Failed to load command journal")?;
    let journaled = history.len();
    let (applied, rejected) = ledger.replay(&history);
    info!(
        "Replayed {} journaled commands ({} applied, {} rejected), ledger at seq {}",
        journaled,
        applied,
        rejected,
        ledger.last_seq()
    );

    let state = AppState::new(
        pool,
        ledger,
        shared_secret,
        max_body_bytes,
        journal_browse_max_limit,
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("wrrl-ld listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
