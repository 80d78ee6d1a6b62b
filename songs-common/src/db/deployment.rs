//! Transaction capability of the connected database
//!
//! Rollback is only meaningful when SQLite keeps a journal, and a
//! `query_only` connection cannot open a write transaction at all. Both are
//! read from pragmas on a pooled connection.

use crate::Result;
use sqlx::SqlitePool;

/// Descriptor of the connected deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Value of `PRAGMA journal_mode`, lowercased
    pub journal_mode: String,
    /// `PRAGMA query_only` is set
    pub read_only: bool,
}

impl Deployment {
    /// Query the descriptor from one pooled connection
    pub async fn describe(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await?;

        let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&mut *conn)
            .await?;
        let query_only: i64 = sqlx::query_scalar("PRAGMA query_only")
            .fetch_one(&mut *conn)
            .await?;

        Ok(Self {
            journal_mode: journal_mode.to_ascii_lowercase(),
            read_only: query_only != 0,
        })
    }

    /// True when multi-statement transactions can be rolled back
    pub fn supports_transactions(&self) -> bool {
        self.journal_mode != "off" && !self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(journal_mode: &str, read_only: bool) -> Deployment {
        Deployment {
            journal_mode: journal_mode.to_string(),
            read_only,
        }
    }

    #[test]
    fn test_journaled_writable_supports_transactions() {
        assert!(deployment("wal", false).supports_transactions());
        assert!(deployment("delete", false).supports_transactions());
        assert!(deployment("memory", false).supports_transactions());
    }

    #[test]
    fn test_journal_off_does_not_support_transactions() {
        assert!(!deployment("off", false).supports_transactions());
    }

    #[test]
    fn test_read_only_does_not_support_transactions() {
        assert!(!deployment("wal", true).supports_transactions());
    }
}
