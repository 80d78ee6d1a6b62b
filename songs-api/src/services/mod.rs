//! Business operations over the repositories
//!
//! Each call opens its own unit of work; services never touch storage
//! directly.

pub mod auth_service;
pub mod ratings_service;
pub mod songs_service;

pub use auth_service::AuthService;
pub use ratings_service::{RatingStatsView, RatingsService};
pub use songs_service::{AverageDifficultyView, SearchSongsView, SongsListView, SongsService};

/// Round to 3 decimals for presentation
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
