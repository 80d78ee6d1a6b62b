//! Rating routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use songs_common::db::{RATING_MAX, RATING_MIN};
use uuid::Uuid;

use super::songs::to_value;
use super::validation::{Validate, ValidatedJson};
use crate::cache::{route_key, RATING_STATS_PREFIX, RATING_STATS_TTL};
use crate::error::{ApiResult, FieldError};
use crate::services::RatingStatsView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddRatingRequest {
    pub song_id: String,
    pub rating: i64,
}

impl Validate for AddRatingRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        if (RATING_MIN..=RATING_MAX).contains(&self.rating) {
            Ok(())
        } else {
            Err(vec![FieldError::new(
                "rating",
                format!("Rating must be between {} and {}", RATING_MIN, RATING_MAX),
            )])
        }
    }
}

/// POST /songs/ratings
pub async fn add_rating(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<AddRatingRequest>,
) -> ApiResult<(StatusCode, Json<RatingStatsView>)> {
    let view = state.ratings.submit_rating(&body.song_id, body.rating).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /songs/:song_id/ratings
pub async fn get_rating_stats(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> ApiResult<Json<Value>> {
    // Key on the canonical id so invalidation after a rating finds it
    let key_id = Uuid::parse_str(&song_id)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| song_id.clone());
    let key = route_key(RATING_STATS_PREFIX, "get_rating_stats", &[("song_id", key_id)]);
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let view = state.ratings.get_rating_stats(&song_id).await?;
    let body = to_value(&view)?;
    state.cache.set(&key, body.clone(), RATING_STATS_TTL);
    Ok(Json(body))
}
