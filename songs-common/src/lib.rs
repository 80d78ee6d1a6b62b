//! # Songs Common Library
//!
//! Shared code for the songs catalog service:
//! - Error type and result alias
//! - Settings loading (TOML file, environment, compiled defaults)
//! - Logging initialization
//! - Database connection, schema and storage models

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use config::Settings;
pub use error::{Error, Result};
