//! Seeding: catalog from a JSON-lines file, plus the configured user

use crate::uow::{TransactionMode, UnitOfWork};
use songs_common::config::AuthConfig;
use songs_common::db::NewSong;
use songs_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

/// Parse one song per non-blank line
pub fn parse_songs(content: &str) -> Result<Vec<NewSong>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<NewSong>(line)
                .map_err(|e| Error::InvalidInput(format!("Line {}: {}", idx + 1, e)))
        })
        .collect()
}

/// Insert songs from `path` when the catalog is empty; returns how many were inserted
pub async fn seed_songs(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let songs = parse_songs(&content)?;

    let mut uow = UnitOfWork::new(pool.clone());
    uow.enter(TransactionMode::Transactional).await;

    let result = async {
        let existing = uow.songs().count().await?;
        if existing > 0 {
            info!(existing, "Catalog already populated, skipping seed");
            return Ok(0);
        }
        uow.songs().bulk_insert(&songs).await
    }
    .await;

    let inserted = uow.exit(result).await?;
    if inserted > 0 {
        info!(inserted, path = %path.display(), "Seeded songs");
    }
    Ok(inserted)
}

/// Create the configured seed user if it does not exist yet; true when created
pub async fn seed_user(pool: &SqlitePool, auth: &AuthConfig) -> Result<bool> {
    let mut uow = UnitOfWork::new(pool.clone());
    uow.enter(TransactionMode::NonTransactional).await;

    let result = async {
        if uow.users().get_by_username(&auth.seed_username).await?.is_some() {
            return Ok(false);
        }
        match uow.users().create(&auth.seed_username, &auth.seed_password).await {
            Ok(_) => Ok(true),
            Err(Error::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
    .await;

    let created = uow.exit(result).await?;
    if created {
        info!(username = %auth.seed_username, "Seeded user");
    } else {
        warn!(username = %auth.seed_username, "Seed user already exists");
    }
    Ok(created)
}
