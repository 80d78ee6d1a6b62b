//! Catalog routes: list, search, average difficulty
//!
//! Successful responses are cached by route prefix and sorted query
//! parameters.

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

use super::validation::{level_filter, page_request, search_message};
use crate::cache::{
    route_key, AVERAGE_DIFFICULTY_PREFIX, AVERAGE_DIFFICULTY_TTL, LIST_PREFIX, LIST_TTL,
    SEARCH_PREFIX, SEARCH_TTL,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /songs?page&page_size
pub async fn list_songs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let page = page_request(&params, state.settings.max_page_size)?;

    let key = route_key(LIST_PREFIX, "list_songs", &query_pairs(&params));
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let view = state.songs.list_songs(page).await?;
    let body = to_value(&view)?;
    state.cache.set(&key, body.clone(), LIST_TTL);
    Ok(Json(body))
}

/// GET /songs/search?message&page&page_size
pub async fn search_songs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let message = search_message(&params)?;
    let page = page_request(&params, state.settings.max_page_size)?;

    let key = route_key(SEARCH_PREFIX, "search_songs", &query_pairs(&params));
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let view = state.songs.search_songs(&message, page).await?;
    let body = to_value(&view)?;
    state.cache.set(&key, body.clone(), SEARCH_TTL);
    Ok(Json(body))
}

/// GET /songs/difficulty/average?level
pub async fn average_difficulty(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let level = level_filter(&params)?;

    let key = route_key(
        AVERAGE_DIFFICULTY_PREFIX,
        "average_difficulty",
        &query_pairs(&params),
    );
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let view = state.songs.average_difficulty(level).await?;
    let body = to_value(&view)?;
    state.cache.set(&key, body.clone(), AVERAGE_DIFFICULTY_TTL);
    Ok(Json(body))
}

pub(crate) fn query_pairs(params: &HashMap<String, String>) -> Vec<(&str, String)> {
    params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
}

pub(crate) fn to_value<T: serde::Serialize>(view: &T) -> Result<Value, ApiError> {
    serde_json::to_value(view).map_err(|e| ApiError::Internal(format!("Serialize response: {}", e)))
}
