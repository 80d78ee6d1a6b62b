//! Settings loading and config file resolution
//!
//! Priority order (highest first):
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`SONGS_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SONGS_CONFIG";

/// JWT secret shipped as the compiled default; must be overridden outside local runs
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(Error::Config(format!("Unknown environment: {}", other))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

/// SQLite journal mode requested for every pooled connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl FromStr for JournalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "truncate" => Ok(JournalMode::Truncate),
            "persist" => Ok(JournalMode::Persist),
            "memory" => Ok(JournalMode::Memory),
            "wal" => Ok(JournalMode::Wal),
            "off" => Ok(JournalMode::Off),
            other => Err(Error::Config(format!("Unknown journal mode: {}", other))),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

/// Database section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (created if missing)
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    /// Request multi-statement transactions for rating submissions
    pub use_transactions: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 20,
            busy_timeout_ms: 5000,
            journal_mode: JournalMode::Wal,
            use_transactions: true,
        }
    }
}

/// Authentication section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub token_ttl_minutes: i64,
    /// User created by `seed-users`
    pub seed_username: String,
    pub seed_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_algorithm: "HS256".to_string(),
            token_ttl_minutes: 60,
            seed_username: "testuser".to_string(),
            seed_password: "testpass".to_string(),
        }
    }
}

/// Response cache section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// Rate limiting section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: 100,
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Complete service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// JSON-lines catalog used by `seed-songs`
    pub songs_json_path: PathBuf,
    pub max_page_size: i64,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            host: "127.0.0.1".to_string(),
            port: 5800,
            songs_json_path: PathBuf::from("songs.json"),
            max_page_size: 100,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings: TOML file (if any), then `SONGS_*` environment overrides
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut settings = match resolve_config_path(explicit_path) {
            Some(path) if path.exists() => Self::from_toml_file(&path)?,
            Some(path) => {
                warn!("Config file {} not found, using compiled defaults", path.display());
                Self::default()
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Self::default()
            }
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let settings = Self::from_toml_str(&content)?;
        info!("Loaded config file: {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `SONGS_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SONGS_ENVIRONMENT") {
            self.environment = v.parse()?;
        }
        if let Some(v) = lookup("SONGS_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("SONGS_PORT") {
            self.port = parse_env("SONGS_PORT", &v)?;
        }
        if let Some(v) = lookup("SONGS_JSON_PATH") {
            self.songs_json_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SONGS_MAX_PAGE_SIZE") {
            self.max_page_size = parse_env("SONGS_MAX_PAGE_SIZE", &v)?;
        }

        if let Some(v) = lookup("SONGS_DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SONGS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("SONGS_DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("SONGS_DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_env("SONGS_DATABASE_BUSY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("SONGS_DATABASE_JOURNAL_MODE") {
            self.database.journal_mode = v.parse()?;
        }
        if let Some(v) = lookup("SONGS_USE_TRANSACTIONS") {
            self.database.use_transactions = parse_bool("SONGS_USE_TRANSACTIONS", &v)?;
        }

        if let Some(v) = lookup("SONGS_JWT_SECRET_KEY") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("SONGS_JWT_ALGORITHM") {
            self.auth.jwt_algorithm = v;
        }
        if let Some(v) = lookup("SONGS_TOKEN_TTL_MINUTES") {
            self.auth.token_ttl_minutes = parse_env("SONGS_TOKEN_TTL_MINUTES", &v)?;
        }

        if let Some(v) = lookup("SONGS_CACHE_ENABLED") {
            self.cache.enabled = parse_bool("SONGS_CACHE_ENABLED", &v)?;
        }

        if let Some(v) = lookup("SONGS_RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = parse_bool("SONGS_RATE_LIMIT_ENABLED", &v)?;
        }
        if let Some(v) = lookup("SONGS_RATE_LIMIT_PER_MINUTE") {
            self.rate_limit.per_minute = parse_env("SONGS_RATE_LIMIT_PER_MINUTE", &v)?;
        }

        if let Some(v) = lookup("SONGS_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("SONGS_LOG_FORMAT") {
            self.logging.format = v.parse()?;
        }

        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size < 1 {
            return Err(Error::Config("max_page_size must be at least 1".to_string()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(Error::Config("auth.jwt_secret must not be empty".to_string()));
        }
        if self.auth.token_ttl_minutes < 1 {
            return Err(Error::Config("auth.token_ttl_minutes must be at least 1".to_string()));
        }
        if self.rate_limit.enabled && self.rate_limit.per_minute == 0 {
            return Err(Error::Config("rate_limit.per_minute must be non-zero".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config("database.max_connections must be non-zero".to_string()));
        }
        if self.is_production() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("Running in production with the default JWT secret");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve which config file to read, if any
///
/// 1. Explicit path (CLI), returned even if missing so the caller can warn
/// 2. `SONGS_CONFIG` environment variable
/// 3. `<config_dir>/songs-api/config.toml` when it exists
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("songs-api").join("config.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("songs-api").join("songs.db"))
        .unwrap_or_else(|| PathBuf::from("./songs_data/songs.db"))
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {} ({})", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid boolean for {}: {}", key, value))),
    }
}
