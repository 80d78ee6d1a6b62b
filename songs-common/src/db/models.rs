//! Storage models
//!
//! Songs are immutable after seeding. Rating events are append-only. Rating
//! aggregates hold the running count/sum/min/max for one song.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Lowest accepted rating
pub const RATING_MIN: i64 = 1;
/// Highest accepted rating
pub const RATING_MAX: i64 = 5;

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Song {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub difficulty: f64,
    pub level: i64,
    pub released: NaiveDate,
}

/// Song as read from the seed file, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub artist: String,
    pub title: String,
    pub difficulty: f64,
    pub level: i64,
    pub released: NaiveDate,
}

/// One accepted rating submission
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct RatingEvent {
    pub id: String,
    pub song_id: String,
    pub rating: i64,
    pub created_at: NaiveDateTime,
}

/// Running statistics for a rated song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RatingAggregate {
    pub count: i64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl RatingAggregate {
    /// `sum / count`, or `None` before the first rating
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

/// Account able to obtain access tokens
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
}
