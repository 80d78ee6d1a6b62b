//! Transaction strategies selected when a unit of work is entered
//!
//! `NullTransaction` settles as a no-op. `LiveTransaction` owns the
//! transaction bound into the shared context and commits or rolls it back.

use super::context::TxContext;
use songs_common::db::Deployment;
use songs_common::Result;
use tracing::{debug, warn};

/// Statement issued inside a fresh transaction to confirm it is usable
///
/// A write that touches no rows still takes SQLite's write lock, so a
/// deployment that cannot write inside a transaction fails here rather than
/// on the first real statement.
const PROBE_SQL: &str = "DELETE FROM rating_aggregates WHERE 0";

/// Whether the caller asks for multi-statement atomicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    #[default]
    NonTransactional,
    Transactional,
}

impl TransactionMode {
    pub fn from_flag(use_transactions: bool) -> Self {
        if use_transactions {
            TransactionMode::Transactional
        } else {
            TransactionMode::NonTransactional
        }
    }
}

/// No transaction: every statement commits on its own
#[derive(Debug, Default)]
pub struct NullTransaction;

/// Transaction bound into a `TxContext` for the current scope
pub struct LiveTransaction {
    ctx: TxContext,
}

impl LiveTransaction {
    /// Run the capability check and probe; `Ok(None)` when the deployment is ineligible
    async fn begin(ctx: &TxContext) -> Result<Option<Self>> {
        let deployment = Deployment::describe(ctx.pool()).await?;
        if !deployment.supports_transactions() {
            debug!(
                journal_mode = %deployment.journal_mode,
                read_only = deployment.read_only,
                "Deployment does not support transactions"
            );
            return Ok(None);
        }

        let mut tx = ctx.pool().begin().await?;
        if let Err(e) = sqlx::query(PROBE_SQL).execute(&mut *tx).await {
            if let Err(rollback_err) = tx.rollback().await {
                debug!(error = %rollback_err, "Rollback of rejected transaction failed");
            }
            return Err(e.into());
        }

        ctx.bind(tx).await;
        Ok(Some(Self { ctx: ctx.clone() }))
    }

    async fn commit(self) -> Result<()> {
        match self.ctx.unbind().await {
            Some(tx) => Ok(tx.commit().await?),
            None => {
                warn!("Commit requested but no transaction was bound");
                Ok(())
            }
        }
    }

    async fn abort(self) -> Result<()> {
        match self.ctx.unbind().await {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }
}

/// Strategy chosen at unit-of-work entry
pub enum TransactionStrategy {
    Null(NullTransaction),
    Live(LiveTransaction),
}

impl TransactionStrategy {
    /// Select a strategy for `mode`
    ///
    /// Never fails: any error while checking or opening the transaction is
    /// logged and the scope runs without one.
    pub async fn begin(ctx: &TxContext, mode: TransactionMode) -> Self {
        if mode == TransactionMode::NonTransactional {
            return TransactionStrategy::Null(NullTransaction);
        }

        match LiveTransaction::begin(ctx).await {
            Ok(Some(live)) => {
                debug!("Transaction started");
                TransactionStrategy::Live(live)
            }
            Ok(None) => TransactionStrategy::Null(NullTransaction),
            Err(e) => {
                warn!(error = %e, "Transaction setup failed, continuing without a transaction");
                TransactionStrategy::Null(NullTransaction)
            }
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, TransactionStrategy::Live(_))
    }

    pub async fn commit(self) -> Result<()> {
        match self {
            TransactionStrategy::Null(_) => Ok(()),
            TransactionStrategy::Live(live) => live.commit().await,
        }
    }

    pub async fn abort(self) -> Result<()> {
        match self {
            TransactionStrategy::Null(_) => Ok(()),
            TransactionStrategy::Live(live) => live.abort().await,
        }
    }
}

impl Default for TransactionStrategy {
    fn default() -> Self {
        TransactionStrategy::Null(NullTransaction)
    }
}
