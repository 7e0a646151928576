//! Ledger: accounts, entries, transfers
//!
//! - [`repository`] - single-statement entity store
//! - [`store`] - transaction executor
//! - [`transfer`] - atomic transfer between two accounts

pub mod currency;
pub mod error;
pub mod models;
pub mod repository;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use currency::CurrencyCode;
pub use error::LedgerError;
pub use models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};
pub use repository::{AccountRepository, EntryRepository, TransferRepository};
pub use store::{Store, TxFuture};
pub use transfer::{
    BalanceUpdate, OverdraftPolicy, TransferTxParams, TransferTxResult, sort_in_lock_order,
    transfer_balance_updates,
};
