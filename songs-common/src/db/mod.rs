//! Database access shared by the songs service
//!
//! - `init`: connection pool and idempotent schema creation
//! - `deployment`: transaction capability descriptor
//! - `models`: row types and rating range constants

pub mod deployment;
pub mod init;
pub mod models;

pub use deployment::Deployment;
pub use init::{connect, init_database, init_schema};
pub use models::{NewSong, RatingAggregate, RatingEvent, Song, User, RATING_MAX, RATING_MIN};
