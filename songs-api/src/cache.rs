//! Best-effort response cache
//!
//! `Cache` never fails its caller: backend errors are logged and treated as a
//! miss (reads) or ignored (writes, invalidation). A disabled cache holds no
//! backend and every call is a no-op.

use serde_json::Value;
use sha2::{Digest, Sha256};
use songs_common::config::CacheConfig;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Keys longer than this are replaced by `<prefix>:hash:<sha256>`
const MAX_KEY_LEN: usize = 100;

pub const LIST_TTL: Duration = Duration::from_secs(300);
pub const SEARCH_TTL: Duration = Duration::from_secs(600);
pub const AVERAGE_DIFFICULTY_TTL: Duration = Duration::from_secs(600);
pub const RATING_STATS_TTL: Duration = Duration::from_secs(300);

pub const LIST_PREFIX: &str = "songs:list";
pub const SEARCH_PREFIX: &str = "songs:search";
pub const AVERAGE_DIFFICULTY_PREFIX: &str = "songs:avg_difficulty";
pub const RATING_STATS_PREFIX: &str = "ratings:stats";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("Cache state poisoned")]
    Poisoned,
}

/// Storage behind the cache handle
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<bool, CacheError>;
    /// Delete every key matching a `*` / `?` glob, returning how many were removed
    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError>;
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process TTL map
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: purge lazily
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.remove(key).is_some())
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let before = entries.len();
        entries.retain(|key, _| !wildcard_matches(pattern, key));
        Ok(before - entries.len())
    }
}

/// Cache handle shared by handlers and services
#[derive(Clone, Default)]
pub struct Cache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(Arc::new(MemoryCache::new()))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache get failed");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.set(key, value, ttl) {
                warn!(key = %key, error = %e, "Cache set failed");
            }
        }
    }

    pub fn delete(&self, key: &str) {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.delete(key) {
                warn!(key = %key, error = %e, "Cache delete failed");
            }
        }
    }

    /// Remove keys matching `pattern`; returns 0 when disabled or on failure
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };
        match backend.delete_matching(pattern) {
            Ok(removed) => {
                debug!(pattern = %pattern, removed, "Cache invalidated");
                removed
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache invalidate pattern failed");
                0
            }
        }
    }
}

/// Build a cache key from a prefix and parts joined by `:`
pub fn cache_key(prefix: &str, parts: &[String]) -> String {
    let joined = parts.join(":");
    if joined.len() > MAX_KEY_LEN {
        let digest = Sha256::digest(joined.as_bytes());
        format!("{}:hash:{:x}", prefix, digest)
    } else if prefix.is_empty() {
        joined
    } else {
        format!("{}:{}", prefix, joined)
    }
}

/// Key for a cached route: handler name then sorted `k=v` parameters
pub fn route_key(prefix: &str, handler: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut parts = Vec::with_capacity(sorted.len() + 1);
    parts.push(handler.to_string());
    parts.extend(sorted.into_iter().map(|(k, v)| format!("{}={}", k, v)));
    cache_key(prefix, &parts)
}

/// Pattern covering every cached rating-stats response for `song_id`
pub fn rating_stats_pattern(song_id: &str) -> String {
    format!("{}:*{}*", RATING_STATS_PREFIX, song_id)
}

fn wildcard_matches(pattern: &str, candidate: &str) -> bool {
    let pattern_chars = pattern.chars().collect::<Vec<_>>();
    let text_chars = candidate.chars().collect::<Vec<_>>();
    let (mut p_idx, mut t_idx) = (0usize, 0usize);
    let mut star_idx: Option<usize> = None;
    let mut match_idx = 0usize;

    while t_idx < text_chars.len() {
        if p_idx < pattern_chars.len()
            && (pattern_chars[p_idx] == text_chars[t_idx] || pattern_chars[p_idx] == '?')
        {
            p_idx += 1;
            t_idx += 1;
        } else if p_idx < pattern_chars.len() && pattern_chars[p_idx] == '*' {
            star_idx = Some(p_idx);
            match_idx = t_idx;
            p_idx += 1;
        } else if let Some(star) = star_idx {
            p_idx = star + 1;
            match_idx += 1;
            t_idx = match_idx;
        } else {
            return false;
        }
    }

    while p_idx < pattern_chars.len() && pattern_chars[p_idx] == '*' {
        p_idx += 1;
    }

    p_idx == pattern_chars.len()
}
