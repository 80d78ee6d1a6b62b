//! Rating events and per-song aggregates

use crate::uow::TxContext;
use songs_common::db::{RatingAggregate, RatingEvent, RATING_MAX, RATING_MIN};
use songs_common::{Error, Result};
use sqlx::Connection;
use uuid::Uuid;

/// Single-statement upsert of the running aggregate
///
/// A new row takes `MIN(RATING_MAX, rating)` / `MAX(RATING_MIN, rating)`,
/// i.e. the first rating wins both comparisons against the seed values. An
/// existing row is updated in place, so concurrent writers never lose an
/// increment or create a second row.
const UPSERT_AGGREGATE_SQL: &str = r#"
    INSERT INTO rating_aggregates (song_id, count, sum, min, max)
    VALUES (?1, 1, ?2, MIN(?3, ?2), MAX(?4, ?2))
    ON CONFLICT(song_id) DO UPDATE SET
        count = count + 1,
        sum = sum + excluded.sum,
        min = MIN(min, excluded.min),
        max = MAX(max, excluded.max)
    RETURNING count, sum, min, max
"#;

#[derive(Clone)]
pub struct RatingsRepository {
    ctx: TxContext,
}

impl RatingsRepository {
    pub fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    /// Record one rating and fold it into the song's aggregate
    ///
    /// The caller must already have checked that the song exists.
    pub async fn apply_rating(&self, song_id: &str, rating: i64) -> Result<RatingAggregate> {
        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(Error::InvalidInput(format!(
                "Rating must be between {} and {}",
                RATING_MIN, RATING_MAX
            )));
        }

        let mut conn = self.ctx.conn().await?;

        // Event and aggregate commit together; inside a bound transaction this is a savepoint
        let mut tx = conn.begin().await?;

        sqlx::query("INSERT INTO rating_events (id, song_id, rating) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(song_id)
            .bind(rating)
            .execute(&mut *tx)
            .await?;

        let aggregate = sqlx::query_as::<_, RatingAggregate>(UPSERT_AGGREGATE_SQL)
            .bind(song_id)
            .bind(rating)
            .bind(RATING_MAX)
            .bind(RATING_MIN)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            song_id = %song_id,
            rating = rating,
            count = aggregate.count,
            "Rating applied"
        );

        Ok(aggregate)
    }

    pub async fn get_by_song(&self, song_id: &str) -> Result<Option<RatingAggregate>> {
        let mut conn = self.ctx.conn().await?;
        let aggregate = sqlx::query_as::<_, RatingAggregate>(
            "SELECT count, sum, min, max FROM rating_aggregates WHERE song_id = ?",
        )
        .bind(song_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(aggregate)
    }

    /// Recorded rating events for a song, oldest first
    pub async fn events_for_song(&self, song_id: &str) -> Result<Vec<RatingEvent>> {
        let mut conn = self.ctx.conn().await?;
        let events = sqlx::query_as::<_, RatingEvent>(
            r#"
            SELECT id, song_id, rating, created_at
            FROM rating_events
            WHERE song_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(song_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(events)
    }

    /// Number of recorded rating events for a song
    pub async fn count_events(&self, song_id: &str) -> Result<i64> {
        let mut conn = self.ctx.conn().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rating_events WHERE song_id = ?")
            .bind(song_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}
