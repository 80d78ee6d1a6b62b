//! Rating submission and statistics
//!
//! `submit_rating` checks the song exists and applies the rating inside one
//! unit of work; with a live transaction the pair is atomic. Cached stats for
//! the song are invalidated after the scope settles.

use super::round3;
use crate::cache::{rating_stats_pattern, Cache};
use crate::uow::{TransactionMode, UnitOfWork};
use serde::Serialize;
use songs_common::db::RatingAggregate;
use songs_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Rating statistics as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStatsView {
    pub song_id: String,
    pub average: Option<f64>,
    pub lowest: Option<i64>,
    pub highest: Option<i64>,
    pub count: i64,
}

impl RatingStatsView {
    fn from_aggregate(song_id: &str, aggregate: Option<RatingAggregate>) -> Self {
        match aggregate {
            Some(agg) if agg.count > 0 => Self {
                song_id: song_id.to_string(),
                average: agg.average().map(round3),
                lowest: Some(agg.min),
                highest: Some(agg.max),
                count: agg.count,
            },
            _ => Self {
                song_id: song_id.to_string(),
                average: None,
                lowest: None,
                highest: None,
                count: 0,
            },
        }
    }
}

#[derive(Clone)]
pub struct RatingsService {
    pool: SqlitePool,
    cache: Cache,
    mode: TransactionMode,
}

impl RatingsService {
    pub fn new(pool: SqlitePool, cache: Cache, mode: TransactionMode) -> Self {
        Self { pool, cache, mode }
    }

    /// Record a rating for an existing song and return the updated statistics
    ///
    /// Any id form accepted by the lookup is stored under the song's canonical id.
    pub async fn submit_rating(&self, song_id: &str, rating: i64) -> Result<RatingStatsView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(self.mode).await;

        let result = async {
            let song = uow
                .songs()
                .get_by_id(song_id)
                .await?
                .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;
            let aggregate = uow.ratings().apply_rating(&song.id, rating).await?;
            Ok((song.id, aggregate))
        }
        .await;

        let (song_id, aggregate) = uow.exit(result).await?;

        let removed = self.cache.invalidate_pattern(&rating_stats_pattern(&song_id));
        info!(
            song_id = %song_id,
            rating = rating,
            count = aggregate.count,
            invalidated = removed,
            "Rating recorded"
        );

        Ok(RatingStatsView::from_aggregate(&song_id, Some(aggregate)))
    }

    /// Statistics for an existing song; zero-valued when it has no ratings yet
    pub async fn get_rating_stats(&self, song_id: &str) -> Result<RatingStatsView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;

        let result = async {
            let song = uow
                .songs()
                .get_by_id(song_id)
                .await?
                .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;
            let aggregate = uow.ratings().get_by_song(&song.id).await?;
            Ok((song.id, aggregate))
        }
        .await;

        let (song_id, aggregate) = uow.exit(result).await?;
        Ok(RatingStatsView::from_aggregate(&song_id, aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>(_: T) {}

    #[tokio::test]
    async fn test_service_futures_are_send() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let service = RatingsService::new(pool, Cache::disabled(), TransactionMode::Transactional);
        assert_send(service.submit_rating("id", 3));
        assert_send(service.get_rating_stats("id"));
    }

    #[test]
    fn test_view_without_aggregate_is_zeroed() {
        let view = RatingStatsView::from_aggregate("s", None);
        assert_eq!(view.count, 0);
        assert_eq!(view.average, None);
        assert_eq!(view.lowest, None);
        assert_eq!(view.highest, None);
    }

    #[test]
    fn test_view_from_aggregate() {
        let view = RatingStatsView::from_aggregate(
            "s",
            Some(RatingAggregate {
                count: 3,
                sum: 10,
                min: 2,
                max: 5,
            }),
        );
        assert_eq!(view.average, Some(3.333));
        assert_eq!(view.lowest, Some(2));
        assert_eq!(view.highest, Some(5));
    }
}
