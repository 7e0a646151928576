//! Bank Ledger - accounts, entries and atomic transfers on PostgreSQL
//!
//! # Modules
//!
//! - [`config`] - YAML application config
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - connection pool and schema bootstrap
//! - [`context`] - cancellation / deadline context
//! - [`ledger`] - entity store, transaction executor, transfer orchestrator
//! - [`random`] - seeded fixture generator

pub mod config;
pub mod context;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod random;

// Convenient re-exports at crate root
pub use context::{CancelHandle, Context, ContextError};
pub use db::Database;
pub use ledger::{
    Account, Entry, LedgerError, OverdraftPolicy, Store, Transfer, TransferTxParams,
    TransferTxResult,
};
