//! Ledger Core - accounts and atomic fund transfers
//!
//! Hexagonal layout:
//!
//! - **domain**: accounts, transfers, money and IBAN rules, errors
//! - **ports**: the `LedgerStore` persistence trait
//! - **services**: account management, the transfer engine, read paths,
//!   migrations and the event log
//! - **adapters**: DuckDB store and per-account locks

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbLedger;
use config::Config;
use services::*;

pub use domain::result::{Error, ErrorKind, Party};
pub use domain::{
    Account, AccountId, AccountStatus, Transfer, TransferId, TransferOrder, TransferPair,
    TransferReceipt, TransferType,
};
pub use ports::LedgerSummary;
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for ledger operations
///
/// Holds the configuration, the store and every service built on it.
pub struct LedgerContext {
    pub config: Config,
    pub store: Arc<DuckDbLedger>,
    pub account_service: AccountService,
    pub transfer_service: TransferService,
    pub query_service: QueryService,
}

impl LedgerContext {
    /// Open the ledger in `ledger_dir`, creating `ledger.duckdb` if needed
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(ledger_dir)?;
        let config = Config::load(ledger_dir)?;
        let store = DuckDbLedger::open(&ledger_dir.join("ledger.duckdb"), config.store_options())?;
        Self::from_store(config, store)
    }

    /// A context over a private in-memory database
    pub fn in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        let store = DuckDbLedger::open_in_memory(config.store_options())?;
        Self::from_store(config, store)
    }

    fn from_store(config: Config, store: DuckDbLedger) -> Result<Self> {
        let store = Arc::new(store);
        store.ensure_schema()?;

        let account_service = AccountService::new(store.clone(), config.allow_seed);
        let transfer_service = TransferService::new(store.clone());
        let query_service = QueryService::new(store.clone());

        Ok(Self {
            config,
            store,
            account_service,
            transfer_service,
            query_service,
        })
    }
}
