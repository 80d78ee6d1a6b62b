//! Unit of Work
//!
//! Groups repository calls into one scope:
//!
//! ```text
//! Idle --enter--> Active --exit(Ok)--> Committed
//!                        --exit(Err)-> Aborted
//! ```
//!
//! Committed and Aborted both count as idle: the scope can be entered again.
//! In transactional mode the three repositories share one SQLite transaction
//! when the deployment supports it; otherwise each statement commits on its
//! own and the unit of work only groups calls.
//!
//! ```ignore
//! let mut uow = UnitOfWork::new(pool);
//! uow.enter(TransactionMode::Transactional).await;
//! let result = do_work(&uow).await;
//! let value = uow.exit(result).await?;
//! ```

mod context;
mod transaction;

pub use context::{DbConn, TxContext};
pub use transaction::{LiveTransaction, NullTransaction, TransactionMode, TransactionStrategy};

use crate::repositories::{RatingsRepository, SongsRepository, UsersRepository};
use songs_common::Result;
use sqlx::SqlitePool;
use tracing::warn;

/// Lifecycle state of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowState {
    Idle,
    Active,
    /// Last scope settled by committing
    Committed,
    /// Last scope settled by aborting
    Aborted,
}

pub struct UnitOfWork {
    ctx: TxContext,
    songs: SongsRepository,
    ratings: RatingsRepository,
    users: UsersRepository,
    strategy: Option<TransactionStrategy>,
    state: UowState,
}

impl UnitOfWork {
    pub fn new(pool: SqlitePool) -> Self {
        let ctx = TxContext::new(pool);
        Self {
            songs: SongsRepository::new(ctx.clone()),
            ratings: RatingsRepository::new(ctx.clone()),
            users: UsersRepository::new(ctx.clone()),
            ctx,
            strategy: None,
            state: UowState::Idle,
        }
    }

    /// Begin the scope
    ///
    /// Transaction setup problems are logged and the scope continues
    /// without a transaction; entering never fails.
    pub async fn enter(&mut self, mode: TransactionMode) {
        if self.is_active() {
            warn!("Unit of work entered while already active; keeping current scope");
            return;
        }

        self.strategy = Some(TransactionStrategy::begin(&self.ctx, mode).await);
        self.state = UowState::Active;
    }

    /// Settle the scope: commit when `result` is `Ok`, abort otherwise
    ///
    /// The transaction is always unbound from the repositories. A commit
    /// failure replaces the result; an abort failure is logged and the
    /// original error is returned.
    pub async fn exit<T>(&mut self, result: Result<T>) -> Result<T> {
        if !self.is_active() {
            warn!("Unit of work exited while not active");
            return result;
        }

        let strategy = self.strategy.take().unwrap_or_default();

        let outcome = match result {
            Ok(value) => match strategy.commit().await {
                Ok(()) => {
                    self.state = UowState::Committed;
                    Ok(value)
                }
                Err(e) => {
                    self.state = UowState::Aborted;
                    Err(e)
                }
            },
            Err(err) => {
                if let Err(abort_err) = strategy.abort().await {
                    warn!(error = %abort_err, "Transaction abort failed");
                }
                self.state = UowState::Aborted;
                Err(err)
            }
        };

        // Commit/abort unbind already; this covers a strategy that never bound.
        if self.ctx.unbind().await.is_some() {
            warn!("Transaction still bound after settle; rolled back on drop");
        }

        outcome
    }

    pub fn state(&self) -> UowState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == UowState::Active
    }

    /// True while a live transaction is bound to the repositories
    pub fn is_transactional(&self) -> bool {
        self.strategy.as_ref().is_some_and(TransactionStrategy::is_live)
    }

    pub fn songs(&self) -> &SongsRepository {
        &self.songs
    }

    pub fn ratings(&self) -> &RatingsRepository {
        &self.ratings
    }

    pub fn users(&self) -> &UsersRepository {
        &self.users
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.is_active() {
            warn!(
                transactional = self.is_transactional(),
                "Unit of work dropped while active; pending writes are rolled back"
            );
        }
    }
}
