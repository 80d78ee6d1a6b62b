//! songs-api - Song catalog and ratings service
//!
//! Subcommands:
//! - `serve` (default): run the HTTP API
//! - `init-db`: create the database schema
//! - `seed-songs [PATH]`: load the JSON-lines catalog into an empty database
//! - `seed-users`: create the configured seed user

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use songs_api::{build_router, cache::Cache, seed, AppState};
use songs_common::{db, logging, Settings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::info;

/// Command-line arguments; each overrides the matching setting
#[derive(Parser, Debug)]
#[command(name = "songs-api", version, about = "Song catalog and ratings API")]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "SONGS_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Create tables and indexes
    InitDb,
    /// Load songs from a JSON-lines file (defaults to `songs_json_path`)
    SeedSongs { path: Option<PathBuf> },
    /// Create the configured seed user
    SeedUsers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(database) = args.database {
        settings.database.path = database;
    }

    logging::init_logging(&settings);

    info!(
        "songs-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(environment = %settings.environment, "Database: {}", settings.database.path.display());

    let pool = db::init_database(&settings.database)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, settings).await,
        Command::InitDb => {
            info!("Database schema ready");
            Ok(())
        }
        Command::SeedSongs { path } => {
            let path = path.unwrap_or_else(|| settings.songs_json_path.clone());
            let inserted = seed::seed_songs(&pool, &path)
                .await
                .with_context(|| format!("Failed to seed songs from {}", path.display()))?;
            info!("Inserted {} songs", inserted);
            Ok(())
        }
        Command::SeedUsers => {
            seed::seed_user(&pool, &settings.auth)
                .await
                .context("Failed to seed users")?;
            Ok(())
        }
    }
}

async fn serve(pool: sqlx::SqlitePool, settings: Settings) -> Result<()> {
    let bind_addr = settings.bind_addr();
    let cache = Cache::from_config(&settings.cache);
    info!(
        cache = cache.is_enabled(),
        transactions = settings.database.use_transactions,
        rate_limit = settings.rate_limit.enabled,
        "Service configuration"
    );

    let state = AppState::new(pool, settings, cache).context("Failed to build application state")?;

    if let Some(limiter) = state.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                limiter.purge();
            }
        });
    }

    let app = build_router(state);

    info!("Starting HTTP server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
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
