//! Shared test fixtures: temporary databases, sample catalog, app wiring

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use songs_api::{build_router, cache::Cache, seed, AppState};
use songs_common::config::{DatabaseConfig, JournalMode, Settings};
use songs_common::db::{init_database, NewSong, Song};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const TEST_USER: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpass";

/// Database living in a temp directory; dropped with the directory
pub struct TestDb {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub config: DatabaseConfig,
}

pub async fn setup_db() -> TestDb {
    setup_db_with(JournalMode::Wal).await
}

pub async fn setup_db_with(journal_mode: JournalMode) -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        path: dir.path().join("songs.db"),
        journal_mode,
        ..DatabaseConfig::default()
    };
    let pool = init_database(&config)
        .await
        .expect("Failed to initialize test database");
    TestDb { dir, pool, config }
}

pub fn sample_songs() -> Vec<NewSong> {
    vec![
        NewSong {
            artist: "The Yousicians".into(),
            title: "Lycanthropic Metamorphosis".into(),
            difficulty: 14.6,
            level: 13,
            released: NaiveDate::from_ymd_opt(2016, 10, 26).unwrap(),
        },
        NewSong {
            artist: "The Yousicians".into(),
            title: "A New Kennel".into(),
            difficulty: 9.1,
            level: 9,
            released: NaiveDate::from_ymd_opt(2010, 2, 3).unwrap(),
        },
        NewSong {
            artist: "Mr Fastfinger".into(),
            title: "Awaki-Waki".into(),
            difficulty: 15.0,
            level: 13,
            released: NaiveDate::from_ymd_opt(2012, 5, 11).unwrap(),
        },
    ]
}

/// Insert the sample catalog and return it in insertion order
pub async fn seed_sample_songs(pool: &SqlitePool) -> Vec<Song> {
    let songs = songs_api::repositories::SongsRepository::new(songs_api::uow::TxContext::new(
        pool.clone(),
    ));
    songs
        .bulk_insert(&sample_songs())
        .await
        .expect("Failed to seed songs");
    let (all, _) = songs.list(0, 100).await.expect("Failed to list songs");
    all
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

pub fn test_settings(db: &TestDb) -> Settings {
    let mut settings = Settings::default();
    settings.database = db.config.clone();
    settings.auth.jwt_secret = "test-secret-key".into();
    settings.auth.seed_username = TEST_USER.into();
    settings.auth.seed_password = TEST_PASSWORD.into();
    settings.rate_limit.enabled = false;
    settings
}

/// Router over a seeded database plus a valid bearer token
pub struct TestApp {
    pub db: TestDb,
    pub state: AppState,
    pub router: Router,
    pub token: String,
    pub songs: Vec<Song>,
}

pub async fn setup_app() -> TestApp {
    let db = setup_db().await;
    let settings = test_settings(&db);
    setup_app_with(db, settings, Cache::disabled()).await
}

pub async fn setup_app_with(db: TestDb, settings: Settings, cache: Cache) -> TestApp {
    let songs = seed_sample_songs(&db.pool).await;
    seed::seed_user(&db.pool, &settings.auth)
        .await
        .expect("Failed to seed user");

    let state = AppState::new(db.pool.clone(), settings, cache).expect("Failed to build state");
    let token = state
        .auth
        .jwt()
        .issue(TEST_USER)
        .expect("Failed to issue token");
    let router = build_router(state.clone());

    TestApp {
        db,
        state,
        router,
        token,
        songs,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_raw(uri: &str, token: Option<&str>, body: &'static str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
