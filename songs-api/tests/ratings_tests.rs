//! Rating service behavior

mod helpers;

use helpers::{count_rows, seed_sample_songs, setup_db};
use serde_json::{json, Value};
use songs_api::cache::{route_key, Cache, CacheBackend, CacheError, MemoryCache, RATING_STATS_PREFIX};
use songs_api::repositories::RatingsRepository;
use songs_api::services::RatingsService;
use songs_api::uow::{TransactionMode, TxContext};
use songs_common::Error;
use std::sync::Arc;
use std::time::Duration;

/// Backend whose every call fails
struct UnavailableBackend;

impl CacheBackend for UnavailableBackend {
    fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    fn delete_matching(&self, _pattern: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

fn service(pool: &sqlx::SqlitePool, cache: Cache) -> RatingsService {
    RatingsService::new(pool.clone(), cache, TransactionMode::Transactional)
}

#[tokio::test]
async fn test_two_ratings_produce_expected_stats() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());
    let song_id = &songs[0].id;

    service.submit_rating(song_id, 3).await.unwrap();
    let stats = service.submit_rating(song_id, 5).await.unwrap();

    assert_eq!(stats.song_id, *song_id);
    assert_eq!(stats.average, Some(4.0));
    assert_eq!(stats.lowest, Some(3));
    assert_eq!(stats.highest, Some(5));
    assert_eq!(stats.count, 2);

    assert_eq!(service.get_rating_stats(song_id).await.unwrap(), stats);
}

#[tokio::test]
async fn test_first_rating_sets_min_and_max() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());

    let stats = service.submit_rating(&songs[1].id, 2).await.unwrap();
    assert_eq!((stats.count, stats.lowest, stats.highest), (1, Some(2), Some(2)));
    assert_eq!(stats.average, Some(2.0));
}

#[tokio::test]
async fn test_unrated_song_has_zero_stats() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());

    let stats = service.get_rating_stats(&songs[2].id).await.unwrap();
    assert_eq!(stats.count, 0);
    assert_eq!(stats.average, None);
    assert_eq!(stats.lowest, None);
    assert_eq!(stats.highest, None);
}

#[tokio::test]
async fn test_rating_unknown_song_is_not_found_and_writes_nothing() {
    let db = setup_db().await;
    seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());

    let missing = uuid::Uuid::new_v4().to_string();
    for song_id in [missing.as_str(), "not-a-valid-id"] {
        let err = service.submit_rating(song_id, 4).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "unexpected error: {:?}", err);
        assert!(matches!(
            service.get_rating_stats(song_id).await,
            Err(Error::NotFound(_))
        ));
    }

    assert_eq!(count_rows(&db.pool, "rating_events").await, 0);
    assert_eq!(count_rows(&db.pool, "rating_aggregates").await, 0);
}

#[tokio::test]
async fn test_alternate_id_forms_share_one_aggregate() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());
    let canonical = songs[0].id.clone();
    let upper = canonical.to_uppercase();
    let simple = canonical.replace('-', "");

    service.submit_rating(&canonical, 2).await.unwrap();
    let from_upper = service.submit_rating(&upper, 4).await.unwrap();
    let from_simple = service.submit_rating(&simple, 5).await.unwrap();

    assert_eq!(from_upper.song_id, canonical);
    assert_eq!(from_simple.song_id, canonical);
    assert_eq!(from_simple.count, 3);
    assert_eq!((from_simple.lowest, from_simple.highest), (Some(2), Some(5)));

    let stats = service.get_rating_stats(&upper).await.unwrap();
    assert_eq!(stats, from_simple);

    assert_eq!(count_rows(&db.pool, "rating_aggregates").await, 1);
    assert_eq!(count_rows(&db.pool, "rating_events").await, 3);
}

#[tokio::test]
async fn test_alternate_id_form_invalidates_canonical_cache_entry() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let cache = Cache::new(Arc::new(MemoryCache::new()));
    let service = service(&db.pool, cache.clone());

    let key = route_key(RATING_STATS_PREFIX, "get_rating_stats", &[("song_id", songs[0].id.clone())]);
    cache.set(&key, json!({"count": 0}), Duration::from_secs(300));

    service.submit_rating(&songs[0].id.to_uppercase(), 3).await.unwrap();
    assert_eq!(cache.get(&key), None);
}

#[tokio::test]
async fn test_non_transactional_mode_records_ratings() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = RatingsService::new(
        db.pool.clone(),
        Cache::disabled(),
        TransactionMode::NonTransactional,
    );

    service.submit_rating(&songs[0].id, 1).await.unwrap();
    let stats = service.submit_rating(&songs[0].id, 2).await.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.average, Some(1.5));
}

#[tokio::test]
async fn test_submit_invalidates_cached_stats_for_song_only() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let cache = Cache::new(Arc::new(MemoryCache::new()));
    let service = service(&db.pool, cache.clone());

    let rated = route_key(RATING_STATS_PREFIX, "get_rating_stats", &[("song_id", songs[0].id.clone())]);
    let other = route_key(RATING_STATS_PREFIX, "get_rating_stats", &[("song_id", songs[1].id.clone())]);
    cache.set(&rated, json!({"count": 0}), Duration::from_secs(300));
    cache.set(&other, json!({"count": 0}), Duration::from_secs(300));

    service.submit_rating(&songs[0].id, 4).await.unwrap();

    assert_eq!(cache.get(&rated), None);
    assert!(cache.get(&other).is_some());
}

#[tokio::test]
async fn test_cache_outage_does_not_fail_submission() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::new(Arc::new(UnavailableBackend)));

    let stats = service.submit_rating(&songs[0].id, 5).await.unwrap();
    assert_eq!(stats.count, 1);
}

#[tokio::test]
async fn test_events_are_recorded_in_order() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    let service = service(&db.pool, Cache::disabled());

    service.submit_rating(&songs[0].id, 3).await.unwrap();
    service.submit_rating(&songs[0].id, 5).await.unwrap();

    let repo = RatingsRepository::new(TxContext::new(db.pool.clone()));
    let events = repo.events_for_song(&songs[0].id).await.unwrap();
    let ratings: Vec<i64> = events.iter().map(|e| e.rating).collect();
    assert_eq!(ratings, vec![3, 5]);
    assert!(events.iter().all(|e| e.song_id == songs[0].id));
    assert_ne!(events[0].id, events[1].id);
}

#[tokio::test]
async fn test_failed_aggregate_update_leaves_no_event() {
    let db = setup_db().await;
    let songs = seed_sample_songs(&db.pool).await;
    sqlx::query(
        "CREATE TRIGGER reject_aggregates BEFORE INSERT ON rating_aggregates \
         BEGIN SELECT RAISE(ABORT, 'aggregate store unavailable'); END",
    )
    .execute(&db.pool)
    .await
    .unwrap();

    let repo = RatingsRepository::new(TxContext::new(db.pool.clone()));
    assert!(repo.apply_rating(&songs[0].id, 4).await.is_err());

    assert_eq!(count_rows(&db.pool, "rating_events").await, 0);
    assert_eq!(count_rows(&db.pool, "rating_aggregates").await, 0);
}
