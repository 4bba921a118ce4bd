//! Ledger store port - persistence abstraction for accounts and transfers

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{
    Account, AccountId, AccountStatus, AccountUpdate, NewAccount, Transfer, TransferId,
    TransferOrder, TransferReceipt,
};

/// Guard run by the store against both accounts of a transfer while they
/// are locked. Returning an error aborts the transfer with no writes.
pub type TransferGuard<'a> = dyn Fn(&Account, &Account) -> Result<()> + 'a;

/// Aggregate counts over the whole ledger, read in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub accounts: i64,
    pub frozen_accounts: i64,
    /// Individual rows, two per completed transfer
    pub transfer_records: i64,
    pub total_balance: Decimal,
}

/// Durable storage for accounts and transfer records
///
/// Every mutating method is atomic: it either applies all of its writes or
/// none. Mutations touching the same account are serialized; mutations on
/// disjoint accounts may proceed concurrently.
pub trait LedgerStore: Send + Sync {
    // === Accounts ===

    /// Insert one account, rejecting a duplicate name or IBAN
    fn create_account(&self, account: &NewAccount) -> Result<Account>;

    /// Insert several accounts in one transaction
    fn create_accounts(&self, accounts: &[NewAccount]) -> Result<Vec<Account>>;

    fn get_account(&self, id: AccountId) -> Result<Account>;

    /// All accounts ordered by id
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Replace name and IBAN, and move the balance to the requested value
    fn update_account(&self, id: AccountId, update: &AccountUpdate) -> Result<Account>;

    fn update_account_status(&self, id: AccountId, status: AccountStatus) -> Result<Account>;

    /// Add `delta` (which may be negative) to the available amount
    fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<Account>;

    /// Remove an account that no transfer references
    fn delete_account(&self, id: AccountId) -> Result<()>;

    // === Transfers ===

    /// Move funds and record the DEBIT/CREDIT pair in one transaction
    fn execute_transfer(
        &self,
        order: &TransferOrder,
        guard: &TransferGuard<'_>,
    ) -> Result<TransferReceipt>;

    fn get_transfer(&self, id: TransferId) -> Result<Transfer>;

    /// Transfer rows ordered by id, optionally only those owned by one account
    fn list_transfers(&self, owner: Option<AccountId>) -> Result<Vec<Transfer>>;

    // === Status ===

    fn summary(&self) -> Result<LedgerSummary>;
}
