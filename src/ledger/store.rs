//! Transaction executor
//!
//! [`Store::exec_tx`] runs a unit of work inside one database transaction and
//! either commits all of its writes or rolls all of them back.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::error::LedgerError;
use super::transfer::OverdraftPolicy;
use crate::context::Context;
use crate::db::Database;

/// Upper bound on the out-of-band cancel request sent for an abandoned
/// transaction
const CANCEL_TIMEOUT: Duration = Duration::from_millis(500);

/// Future returned by a unit of work. It borrows the transaction's
/// connection for `'c`, so it must not capture borrowed outside state.
pub type TxFuture<'c, T> = BoxFuture<'c, Result<T, LedgerError>>;

/// Ledger store: the shared pool plus the transactional operations on it.
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Store {
    db: Database,
    overdraft: OverdraftPolicy,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            overdraft: OverdraftPolicy::default(),
        }
    }

    pub fn with_overdraft_policy(mut self, overdraft: OverdraftPolicy) -> Self {
        self.overdraft = overdraft;
        self
    }

    pub fn overdraft_policy(&self) -> OverdraftPolicy {
        self.overdraft
    }

    /// Pool for standalone (non-transactional) repository calls
    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// Run `work` inside a transaction bound to `ctx`.
    ///
    /// - `work` receives the transaction's connection; every statement it
    ///   issues must go through it.
    /// - `Ok` commits. A commit failure is the call's failure.
    /// - `Err` rolls back. If the rollback fails too, both errors are returned
    ///   as [`LedgerError::Rollback`].
    /// - Cancellation or deadline expiry returns at once. The statement still
    ///   running on the server is cancelled and the transaction is abandoned
    ///   uncommitted, so locks it waits on or holds cannot delay the caller.
    /// - A deadline is also pushed to the server as `lock_timeout` and
    ///   `statement_timeout`; a statement aborted by either reports
    ///   [`LedgerError::DeadlineExceeded`].
    /// - If `work` panics the transaction is dropped, and sqlx rolls it back
    ///   before the connection is reused.
    pub async fn exec_tx<T, F>(&self, ctx: &Context, work: F) -> Result<T, LedgerError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> TxFuture<'c, T>,
    {
        let mut tx = ctx
            .run(self.db.pool().begin())
            .await?
            .map_err(LedgerError::Begin)?;
        let backend_pid = bind_to_context(&mut *tx, ctx).await?;
        debug!(backend_pid = ?backend_pid, "Transaction started");

        let finished = ctx.run(work(&mut *tx)).await;
        let outcome = match finished {
            Ok(Err(err)) if err.is_statement_timeout() && ctx.deadline().is_some() => {
                Err(LedgerError::DeadlineExceeded)
            }
            Ok(result) => result,
            Err(ctx_err) => {
                let err = LedgerError::from(ctx_err);
                self.abandon(tx, backend_pid).await;
                warn!(error = %err, code = err.code(), "Transaction abandoned");
                return Err(err);
            }
        };

        match outcome {
            Ok(value) => {
                // Not raced against ctx: once COMMIT is sent only the server decides.
                tx.commit().await.map_err(LedgerError::Commit)?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(err) => match tx.rollback().await {
                Ok(()) => {
                    warn!(error = %err, code = err.code(), "Transaction rolled back");
                    Err(err)
                }
                Err(rollback) => {
                    error!(
                        error = %err,
                        rollback_error = %rollback,
                        "Transaction rollback failed"
                    );
                    Err(LedgerError::Rollback {
                        cause: Box::new(err),
                        rollback,
                    })
                }
            },
        }
    }

    /// Give up on a transaction whose unit of work was dropped mid-statement.
    ///
    /// The connection cannot run ROLLBACK until its in-flight statement
    /// finishes, which may be never if it is queued behind another
    /// transaction's row lock. That statement is cancelled from a second
    /// connection, then the transaction is dropped: sqlx queues the ROLLBACK
    /// and the pool flushes it, or closes the connection, in the background.
    async fn abandon(&self, tx: Transaction<'static, Postgres>, backend_pid: Option<i32>) {
        if let Some(pid) = backend_pid {
            let cancel = sqlx::query_scalar::<_, bool>("SELECT pg_cancel_backend($1)")
                .bind(pid)
                .fetch_one(self.db.pool());
            match tokio::time::timeout(CANCEL_TIMEOUT, cancel).await {
                Ok(Ok(_)) => debug!(backend_pid = pid, "Running statement cancelled"),
                Ok(Err(e)) => {
                    warn!(backend_pid = pid, error = %e, "Failed to cancel running statement")
                }
                Err(_) => warn!(backend_pid = pid, "Timed out cancelling running statement"),
            }
        }
        drop(tx);
    }
}

/// Tie the server side of a fresh transaction to `ctx`.
///
/// Returns the backend pid so a cancelled call can interrupt the statement it
/// leaves behind. A deadline becomes transaction-local `lock_timeout` and
/// `statement_timeout` settings, so the server gives up on its own even if
/// the cancel request never arrives. A background context costs no round trip.
async fn bind_to_context(
    conn: &mut PgConnection,
    ctx: &Context,
) -> Result<Option<i32>, LedgerError> {
    if ctx.is_background() {
        return Ok(None);
    }

    let pid = match ctx.deadline() {
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout = format!("{}ms", remaining.as_millis().max(1));
            let (pid, _, _) = sqlx::query_as::<_, (i32, String, String)>(
                "SELECT pg_backend_pid(), \
                        set_config('lock_timeout', $1, true), \
                        set_config('statement_timeout', $1, true)",
            )
            .bind(&timeout)
            .fetch_one(&mut *conn)
            .await?;
            pid
        }
        None => {
            sqlx::query_scalar::<_, i32>("SELECT pg_backend_pid()")
                .fetch_one(&mut *conn)
                .await?
        }
    };
    Ok(Some(pid))
}
