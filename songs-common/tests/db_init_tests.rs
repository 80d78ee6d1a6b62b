//! Tests for database initialization and the deployment descriptor

use songs_common::config::{DatabaseConfig, JournalMode};
use songs_common::db::{init_database, Deployment};
use tempfile::TempDir;

fn db_config(dir: &TempDir, journal_mode: JournalMode) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("nested").join("songs.db"),
        journal_mode,
        ..DatabaseConfig::default()
    }
}

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let config = db_config(&dir, JournalMode::Wal);
    assert!(!config.path.exists());

    let pool = init_database(&config).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(config.path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_schema_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = db_config(&dir, JournalMode::Wal);

    let pool = init_database(&config).await.unwrap();
    songs_common::db::init_schema(&pool).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in ["rating_aggregates", "rating_events", "songs", "users"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_catalog_indexes_exist() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&db_config(&dir, JournalMode::Wal)).await.unwrap();

    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "idx_songs_artist",
        "idx_songs_title",
        "idx_songs_level",
        "idx_songs_artist_title_text",
        "idx_songs_level_difficulty",
        "idx_songs_artist_released",
        "idx_rating_events_song",
    ] {
        assert!(indexes.iter().any(|i| i == expected), "missing index {}", expected);
    }
}

#[tokio::test]
async fn test_rating_range_is_enforced_by_store() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&db_config(&dir, JournalMode::Wal)).await.unwrap();

    let result = sqlx::query("INSERT INTO rating_events (id, song_id, rating) VALUES ('e1', 's1', 6)")
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_wal_deployment_supports_transactions() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&db_config(&dir, JournalMode::Wal)).await.unwrap();

    let deployment = Deployment::describe(&pool).await.unwrap();
    assert_eq!(deployment.journal_mode, "wal");
    assert!(!deployment.read_only);
    assert!(deployment.supports_transactions());
}

#[tokio::test]
async fn test_journal_off_deployment_lacks_transactions() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&db_config(&dir, JournalMode::Off)).await.unwrap();

    let deployment = Deployment::describe(&pool).await.unwrap();
    assert_eq!(deployment.journal_mode, "off");
    assert!(!deployment.supports_transactions());
}
