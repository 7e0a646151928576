//! Repository layer for ledger rows
//!
//! Every operation is a single statement and is generic over
//! [`sqlx::PgExecutor`], so the same call runs against the pool (standalone
//! reads, fixtures) or against `&mut PgConnection` inside a transaction.

use sqlx::PgExecutor;

use super::currency::CurrencyCode;
use super::error::LedgerError;
use super::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};

/// Account repository
pub struct AccountRepository;

impl AccountRepository {
    /// Create a new account. The currency code is validated before the insert.
    pub async fn create<'e, E>(
        executor: E,
        params: &CreateAccountParams,
    ) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let currency = CurrencyCode::new(&params.currency)?;

        let account = sqlx::query_as::<_, Account>(
            r#"INSERT INTO accounts (owner, balance, currency)
               VALUES ($1, $2, $3)
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(&params.owner)
        .bind(params.balance)
        .bind(currency.as_str())
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    /// Get account by ID
    pub async fn get<'e, E>(executor: E, id: i64) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts WHERE id = $1 LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("account", id))
    }

    /// Get account by ID and hold its row lock until the surrounding
    /// transaction ends. `NO KEY UPDATE` does not block inserts of rows that
    /// reference the account.
    pub async fn get_for_update<'e, E>(executor: E, id: i64) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts WHERE id = $1 LIMIT 1
               FOR NO KEY UPDATE"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("account", id))
    }

    /// Page through an owner's accounts in insertion order
    pub async fn list<'e, E>(
        executor: E,
        params: &ListAccountsParams,
    ) -> Result<Vec<Account>, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let accounts = sqlx::query_as::<_, Account>(
            r#"SELECT id, owner, balance, currency, created_at
               FROM accounts WHERE owner = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(&params.owner)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(executor)
        .await?;

        Ok(accounts)
    }

    /// Overwrite the balance
    pub async fn update<'e, E>(
        executor: E,
        params: UpdateAccountParams,
    ) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Account>(
            r#"UPDATE accounts SET balance = $2
               WHERE id = $1
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(params.id)
        .bind(params.balance)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("account", params.id))
    }

    /// Add a signed delta to the stored balance in place and return the
    /// post-update row. The row stays locked until the transaction ends.
    pub async fn add_balance<'e, E>(
        executor: E,
        params: AddAccountBalanceParams,
    ) -> Result<Account, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Account>(
            r#"UPDATE accounts SET balance = balance + $1
               WHERE id = $2
               RETURNING id, owner, balance, currency, created_at"#,
        )
        .bind(params.amount)
        .bind(params.id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("account", params.id))
    }

    /// Delete an account. Fails with a foreign key violation while entries or
    /// transfers still reference it.
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<(), LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("account", id));
        }
        Ok(())
    }
}

/// Entry repository. Entries are append-only.
pub struct EntryRepository;

impl EntryRepository {
    pub async fn create<'e, E>(executor: E, params: CreateEntryParams) -> Result<Entry, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let entry = sqlx::query_as::<_, Entry>(
            r#"INSERT INTO entries (account_id, amount)
               VALUES ($1, $2)
               RETURNING id, account_id, amount, created_at"#,
        )
        .bind(params.account_id)
        .bind(params.amount)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }

    pub async fn get<'e, E>(executor: E, id: i64) -> Result<Entry, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Entry>(
            r#"SELECT id, account_id, amount, created_at
               FROM entries WHERE id = $1 LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("entry", id))
    }

    pub async fn list<'e, E>(
        executor: E,
        params: ListEntriesParams,
    ) -> Result<Vec<Entry>, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let entries = sqlx::query_as::<_, Entry>(
            r#"SELECT id, account_id, amount, created_at
               FROM entries WHERE account_id = $1
               ORDER BY id
               LIMIT $2 OFFSET $3"#,
        )
        .bind(params.account_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }
}

/// Transfer repository. Transfers are append-only.
pub struct TransferRepository;

impl TransferRepository {
    pub async fn create<'e, E>(
        executor: E,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"INSERT INTO transfers (from_account_id, to_account_id, amount)
               VALUES ($1, $2, $3)
               RETURNING id, from_account_id, to_account_id, amount, created_at"#,
        )
        .bind(params.from_account_id)
        .bind(params.to_account_id)
        .bind(params.amount)
        .fetch_one(executor)
        .await?;

        Ok(transfer)
    }

    pub async fn get<'e, E>(executor: E, id: i64) -> Result<Transfer, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers WHERE id = $1 LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("transfer", id))
    }

    pub async fn list<'e, E>(
        executor: E,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let transfers = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers
               WHERE from_account_id = $1 OR to_account_id = $2
               ORDER BY id
               LIMIT $3 OFFSET $4"#,
        )
        .bind(params.from_account_id)
        .bind(params.to_account_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(executor)
        .await?;

        Ok(transfers)
    }
}
