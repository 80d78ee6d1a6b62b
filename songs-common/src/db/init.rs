//! Database initialization
//!
//! Opens the SQLite pool with per-connection pragmas and creates the catalog
//! schema. Every statement is idempotent so startup may run it repeatedly.

use crate::config::{DatabaseConfig, JournalMode};
use crate::db::models::{RATING_MAX, RATING_MIN};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::info;

/// Open the pool and create tables and indexes
pub async fn init_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = connect(config).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Open a connection pool, creating the database file if needed
///
/// Journal mode, busy timeout and foreign keys are set through the connect
/// options so every pooled connection carries them, not just the first.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !config.path.exists();

    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .journal_mode(sqlite_journal_mode(config.journal_mode))
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", config.path.display());
    } else {
        info!("Opened existing database: {}", config.path.display());
    }

    Ok(pool)
}

pub(crate) fn sqlite_journal_mode(mode: JournalMode) -> SqliteJournalMode {
    match mode {
        JournalMode::Delete => SqliteJournalMode::Delete,
        JournalMode::Truncate => SqliteJournalMode::Truncate,
        JournalMode::Persist => SqliteJournalMode::Persist,
        JournalMode::Memory => SqliteJournalMode::Memory,
        JournalMode::Wal => SqliteJournalMode::Wal,
        JournalMode::Off => SqliteJournalMode::Off,
    }
}

/// Create all tables and indexes (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_songs_table(pool).await?;
    create_rating_events_table(pool).await?;
    create_rating_aggregates_table(pool).await?;
    create_users_table(pool).await?;
    Ok(())
}

/// `*_folded` columns hold Unicode-lowercased artist/title for search
async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            artist TEXT NOT NULL,
            title TEXT NOT NULL,
            difficulty REAL NOT NULL,
            level INTEGER NOT NULL,
            released TEXT NOT NULL,
            artist_folded TEXT NOT NULL,
            title_folded TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist)",
        "CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title)",
        "CREATE INDEX IF NOT EXISTS idx_songs_level ON songs(level)",
        "CREATE INDEX IF NOT EXISTS idx_songs_artist_title_text ON songs(artist_folded, title_folded)",
        "CREATE INDEX IF NOT EXISTS idx_songs_level_difficulty ON songs(level, difficulty)",
        "CREATE INDEX IF NOT EXISTS idx_songs_artist_released ON songs(artist, released)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

async fn create_rating_events_table(pool: &SqlitePool) -> Result<()> {
    // song_id is not a foreign key; the ratings service checks existence first
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS rating_events (
            id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN {min} AND {max}),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        min = RATING_MIN,
        max = RATING_MAX,
    );
    sqlx::query(&sql).execute(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_rating_events_song ON rating_events(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_rating_aggregates_table(pool: &SqlitePool) -> Result<()> {
    // min seeded at the top of the range and max at the bottom so the first rating wins both
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS rating_aggregates (
            song_id TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
            sum INTEGER NOT NULL DEFAULT 0,
            min INTEGER NOT NULL DEFAULT {max},
            max INTEGER NOT NULL DEFAULT {min}
        )
        "#,
        min = RATING_MIN,
        max = RATING_MAX,
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
