//! Shared transaction context
//!
//! The three repositories of one unit of work hold clones of the same
//! `TxContext`. When a live transaction is bound into the slot every
//! repository statement runs on it; otherwise each statement takes its own
//! pooled connection and commits immediately.

use songs_common::Result;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

type Slot = Option<Transaction<'static, Sqlite>>;

/// Pool plus the optional transaction bound for the current scope
#[derive(Clone)]
pub struct TxContext {
    pool: SqlitePool,
    slot: Arc<Mutex<Slot>>,
}

impl TxContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connection for the next statement: the bound transaction if any, else a pooled one
    pub async fn conn(&self) -> Result<DbConn<'_>> {
        {
            let guard = self.slot.lock().await;
            if let Ok(tx) = MutexGuard::try_map(guard, Option::as_mut) {
                return Ok(DbConn::Bound(tx));
            }
        }
        Ok(DbConn::Pooled(self.pool.acquire().await?))
    }

    pub async fn is_bound(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub(crate) async fn bind(&self, tx: Transaction<'static, Sqlite>) {
        let previous = self.slot.lock().await.replace(tx);
        if previous.is_some() {
            tracing::warn!("Replaced a transaction that was still bound; it will be rolled back");
        }
    }

    pub(crate) async fn unbind(&self) -> Option<Transaction<'static, Sqlite>> {
        self.slot.lock().await.take()
    }
}

/// Connection handed to a repository for one statement
pub enum DbConn<'a> {
    /// Bound transaction, locked for the duration of the statement
    Bound(MappedMutexGuard<'a, Transaction<'static, Sqlite>>),
    Pooled(PoolConnection<Sqlite>),
}

impl Deref for DbConn<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        match self {
            DbConn::Bound(tx) => &***tx,
            DbConn::Pooled(conn) => &**conn,
        }
    }
}

impl DerefMut for DbConn<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            DbConn::Bound(tx) => &mut ***tx,
            DbConn::Pooled(conn) => &mut **conn,
        }
    }
}
