//! Transfer orchestrator
//!
//! A transfer is one transaction made of five writes:
//!
//! ```text
//! INSERT transfer (from, to, amount)
//! INSERT entry    (from, -amount)
//! INSERT entry    (to,   +amount)
//! UPDATE balance  (lower account id first)
//! UPDATE balance  (higher account id second)
//! ```
//!
//! Balance updates take row locks. Applying them in ascending account id
//! order means two transfers over the same pair of accounts always request
//! the locks in the same order, whatever their direction, so they can never
//! wait on each other in a cycle.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::{info, warn};

use super::error::LedgerError;
use super::models::{
    Account, AddAccountBalanceParams, CreateEntryParams, CreateTransferParams, Entry, Transfer,
};
use super::repository::{AccountRepository, EntryRepository, TransferRepository};
use super::store::Store;
use crate::context::Context;

/// What to do when a debit leaves the source account below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdraftPolicy {
    /// Abort the transfer with `InsufficientFunds`
    #[default]
    Reject,
    /// Let the balance go negative; the caller has already checked funds
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Everything a committed transfer wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Signed balance change on one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub account_id: i64,
    pub amount: i64,
}

impl BalanceUpdate {
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Sort rows into the canonical lock acquisition order: ascending key.
///
/// The sort is stable, so rows with equal keys keep their relative order.
/// Any operation that updates several rows of one table in one transaction
/// must apply its updates in this order.
pub fn sort_in_lock_order<T, K, F>(rows: &mut [T], key: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    rows.sort_by_key(key);
}

/// Balance updates of a transfer, in the order they must be applied.
///
/// The credit is listed first, so a self-transfer credits before it debits
/// and never dips below the starting balance.
pub fn transfer_balance_updates(params: &TransferTxParams) -> [BalanceUpdate; 2] {
    let mut updates = [
        BalanceUpdate {
            account_id: params.to_account_id,
            amount: params.amount,
        },
        BalanceUpdate {
            account_id: params.from_account_id,
            amount: -params.amount,
        },
    ];
    sort_in_lock_order(&mut updates, |u| u.account_id);
    updates
}

impl Store {
    /// Move `amount` from one account to another as a single transaction.
    ///
    /// Nothing is retried here. Any failure rolls back every write of this
    /// call; the caller may retry the whole transfer.
    pub async fn transfer_tx(
        &self,
        ctx: &Context,
        params: TransferTxParams,
    ) -> Result<TransferTxResult, LedgerError> {
        if params.amount <= 0 {
            return Err(LedgerError::InvalidAmount(params.amount));
        }

        let overdraft = self.overdraft_policy();
        let result = self
            .exec_tx(ctx, move |conn| {
                Box::pin(async move { execute_transfer(conn, params, overdraft).await })
            })
            .await;

        match &result {
            Ok(res) => info!(
                transfer_id = res.transfer.id,
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                amount = params.amount,
                "Transfer committed"
            ),
            Err(e) => warn!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                amount = params.amount,
                code = e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Transfer failed"
            ),
        }

        result
    }
}

async fn execute_transfer(
    conn: &mut PgConnection,
    params: TransferTxParams,
    overdraft: OverdraftPolicy,
) -> Result<TransferTxResult, LedgerError> {
    let transfer = TransferRepository::create(
        &mut *conn,
        CreateTransferParams {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
        },
    )
    .await?;

    let from_entry = EntryRepository::create(
        &mut *conn,
        CreateEntryParams {
            account_id: params.from_account_id,
            amount: -params.amount,
        },
    )
    .await?;

    let to_entry = EntryRepository::create(
        &mut *conn,
        CreateEntryParams {
            account_id: params.to_account_id,
            amount: params.amount,
        },
    )
    .await?;

    let [first, second] = transfer_balance_updates(&params);
    let first_account = add_balance(&mut *conn, first).await?;
    let second_account = add_balance(&mut *conn, second).await?;

    // A self-transfer updates one row twice; only the second row is committed state
    let (from_account, to_account) = if params.from_account_id == params.to_account_id {
        (second_account.clone(), second_account)
    } else if first.is_debit() {
        (first_account, second_account)
    } else {
        (second_account, first_account)
    };

    if from_account.currency != to_account.currency {
        return Err(LedgerError::CurrencyMismatch {
            from: from_account.currency,
            to: to_account.currency,
        });
    }

    if overdraft == OverdraftPolicy::Reject && from_account.balance < 0 {
        return Err(LedgerError::InsufficientFunds {
            account_id: from_account.id,
            balance: from_account.balance,
            amount: params.amount,
        });
    }

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

async fn add_balance(
    conn: &mut PgConnection,
    update: BalanceUpdate,
) -> Result<Account, LedgerError> {
    AccountRepository::add_balance(
        conn,
        AddAccountBalanceParams {
            id: update.account_id,
            amount: update.amount,
        },
    )
    .await
}
