//! Query service - read paths for accounts and transfers

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{Account, AccountId, Transfer, TransferId};
use crate::ports::{LedgerStore, LedgerSummary};

pub struct QueryService {
    store: Arc<dyn LedgerStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        self.store.list_accounts()
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account> {
        self.store.get_account(id)
    }

    pub fn list_transfers(&self) -> Result<Vec<Transfer>> {
        self.store.list_transfers(None)
    }

    /// Rows owned by `account_id`: its DEBITs and its CREDITs.
    /// `NotFound` for an unknown account rather than an empty list.
    pub fn list_account_transfers(&self, account_id: AccountId) -> Result<Vec<Transfer>> {
        self.store.get_account(account_id)?;
        self.store.list_transfers(Some(account_id))
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer> {
        self.store.get_transfer(id)
    }

    pub fn summary(&self) -> Result<LedgerSummary> {
        self.store.summary()
    }
}
