//! birdwatch-sq (Sighting Query) - HTTP entry point
//!
//! Resolves configuration, opens (or creates) the database, optionally runs
//! the CSV bootstrap, then serves the JSON API until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use birdwatch_common::config::{CliOverrides, ServiceConfig, TomlConfig};
use birdwatch_common::db::init_database;
use birdwatch_sq::{bootstrap, build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for birdwatch-sq
#[derive(Parser, Debug)]
#[command(name = "birdwatch-sq")]
#[command(about = "Bird sighting query service")]
#[command(version)]
struct Args {
    /// Root folder holding birdwatch.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Directory containing species.csv, sightings.csv and checklist.csv
    #[arg(long)]
    bootstrap_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.config/birdwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load empty bulk tables from CSV before serving
    #[arg(long)]
    bootstrap: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let source = TomlConfig::discover(args.config.as_deref());
    let config = ServiceConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            port: args.port,
            bind_address: args.bind,
            bootstrap_dir: args.bootstrap_dir,
        },
        source.config,
    );

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "birdwatch_sq={level},birdwatch_common={level},tower_http={level}",
                    level = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting birdwatch-sq v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(path) = &source.path {
        info!("Config file: {}", path.display());
    }
    if let Some(warning) = &source.warning {
        warn!("{}", warning);
    }

    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(pool, config.bootstrap_dir.clone())
        .with_session_ttl(Duration::from_secs(config.session_ttl_secs))
        .with_require_identity(config.require_identity);

    if !config.require_identity {
        warn!("Identity checks disabled: requests without X-User-Email act as anonymous");
    }

    if args.bootstrap {
        info!("Bootstrapping bulk tables from {}", config.bootstrap_dir.display());
        let report = bootstrap::run(&state.db, &state.bootstrap_dir)
            .await
            .context("Bootstrap failed")?;
        info!(
            "Bootstrap done: species={} sightings={} checklist={}",
            report.species.total, report.sightings.total, report.checklist.total
        );
    }

    let app = build_router(state);

    let ip = config
        .bind_address
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("birdwatch-sq listening on http://{}", addr);
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
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
