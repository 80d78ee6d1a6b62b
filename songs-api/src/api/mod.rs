//! HTTP API handlers and middleware

pub mod auth;
pub mod health;
pub mod rate_limit;
pub mod ratings;
pub mod songs;
pub mod validation;

pub use auth::{auth_middleware, login, register, AuthenticatedUser};
pub use health::{health_check, health_routes};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use ratings::{add_rating, get_rating_stats};
pub use songs::{average_difficulty, list_songs, search_songs};
