//! Catalog listing, search and difficulty statistics

use super::round3;
use crate::pagination::{calculate_pagination, PageRequest, Pagination};
use crate::uow::{TransactionMode, UnitOfWork};
use serde::Serialize;
use songs_common::db::Song;
use songs_common::Result;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct SongsListView {
    pub data: Vec<Song>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSongsView {
    pub message: String,
    pub data: Vec<Song>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageDifficultyView {
    /// `None` when no song matches the filter
    pub average_difficulty: Option<f64>,
    pub level: Option<i64>,
}

#[derive(Clone)]
pub struct SongsService {
    pool: SqlitePool,
}

impl SongsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_songs(&self, page: PageRequest) -> Result<SongsListView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;
        let result = uow.songs().list(page.offset(), page.page_size).await;
        let (data, total) = uow.exit(result).await?;

        Ok(SongsListView {
            data,
            pagination: calculate_pagination(page, total),
        })
    }

    pub async fn search_songs(&self, message: &str, page: PageRequest) -> Result<SearchSongsView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;
        let result = uow.songs().search(message, page.offset(), page.page_size).await;
        let (data, total) = uow.exit(result).await?;

        Ok(SearchSongsView {
            message: message.to_string(),
            data,
            pagination: calculate_pagination(page, total),
        })
    }

    pub async fn average_difficulty(&self, level: Option<i64>) -> Result<AverageDifficultyView> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;
        let result = uow.songs().average_difficulty(level).await;
        let average = uow.exit(result).await?;

        Ok(AverageDifficultyView {
            average_difficulty: average.map(round3),
            level,
        })
    }
}
