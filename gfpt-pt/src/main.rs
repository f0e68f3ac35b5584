//! gfpt-pt (Production Tracking) - garment factory production service
//!
//! Serves the production, report and registry endpoints over HTTP and runs
//! the machine servicing poll in the background.

use anyhow::{Context, Result};
use clap::Parser;
use gfpt_common::config::{load_toml_config, RootFolderInitializer, RootFolderResolver};
use gfpt_common::EventBus;
use gfpt_pt::services::servicing::spawn_servicing_poll;
use gfpt_pt::{build_router, AppState, EVENT_BUS_CAPACITY};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "gfpt-pt", version, about = "Garment factory production tracker")]
struct Args {
    /// HTTP port (overrides the config file)
    #[arg(short, long, env = "GFPT_PORT")]
    port: Option<u16>,

    /// Root folder holding gfpt.db
    #[arg(short, long, env = "GFPT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config location)
    #[arg(short, long, env = "GFPT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level applies
    let config = load_toml_config(args.config.as_deref());

    let level = &config.logging.level;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "gfpt_pt={level},gfpt_common={level},tower_http={level}"
            ))
        }))
        .init();

    info!(
        "Starting GFPT Production Tracking (gfpt-pt) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &args.config {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("Config file: platform default"),
    }

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = gfpt_pt::db::init_database_pool(&db_path).await?;
    info!("✓ Database ready");

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let shutdown = CancellationToken::new();

    let poll = spawn_servicing_poll(
        pool.clone(),
        event_bus.clone(),
        Duration::from_secs(config.servicing.poll_interval_secs),
        shutdown.clone(),
    );

    let state = AppState::new(pool.clone(), event_bus);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.bind_host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("gfpt-pt listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = poll.await {
        tracing::warn!("Servicing poll ended abnormally: {}", e);
    }
    pool.close().await;

    info!("gfpt-pt stopped");
    Ok(())
}

/// Resolve on Ctrl+C / SIGTERM, then stop background work
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    token.cancel();
}
