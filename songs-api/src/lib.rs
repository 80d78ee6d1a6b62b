//! songs-api library
//!
//! REST API over a song catalog: listing, search, difficulty statistics and
//! per-song rating aggregates, guarded by JWT bearer authentication.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use songs_common::Settings;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod error;
pub mod pagination;
pub mod repositories;
pub mod security;
pub mod seed;
pub mod services;
pub mod uow;

use api::RateLimiter;
use cache::Cache;
use security::JwtManager;
use services::{AuthService, RatingsService, SongsService};
use uow::TransactionMode;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub settings: Arc<Settings>,
    pub cache: Cache,
    pub songs: SongsService,
    pub ratings: RatingsService,
    pub auth: AuthService,
    /// `None` when rate limiting is disabled
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    /// Wire services from settings; fails only on invalid auth settings
    pub fn new(db: SqlitePool, settings: Settings, cache: Cache) -> songs_common::Result<Self> {
        let jwt = JwtManager::from_config(&settings.auth)?;
        let mode = TransactionMode::from_flag(settings.database.use_transactions);

        let rate_limiter = if settings.rate_limit.enabled {
            RateLimiter::per_minute(settings.rate_limit.per_minute).map(Arc::new)
        } else {
            None
        };

        Ok(Self {
            songs: SongsService::new(db.clone()),
            ratings: RatingsService::new(db.clone(), cache.clone(), mode),
            auth: AuthService::new(db.clone(), jwt),
            db,
            settings: Arc::new(settings),
            cache,
            rate_limiter,
        })
    }
}

/// Build application router
///
/// Everything is mounted under `/api/v1`; `/health` is also served at the
/// root. Protected routes authenticate before rate limiting so quotas are
/// keyed by user.
pub fn build_router(state: AppState) -> Router {
    // Layers run last-added first: auth, then rate limiting
    let protected = Router::new()
        .route("/songs", get(api::list_songs))
        .route("/songs/search", get(api::search_songs))
        .route("/songs/difficulty/average", get(api::average_difficulty))
        .route("/songs/ratings", post(api::add_rating))
        .route("/songs/:song_id/ratings", get(api::get_rating_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/register", post(api::register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::rate_limit_middleware,
        ));

    let v1 = Router::new()
        .merge(protected)
        .merge(public)
        .merge(api::health_routes());

    Router::new()
        .nest("/api/v1", v1)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
