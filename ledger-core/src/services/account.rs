//! Account service - account lifecycle and balance adjustments

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountId, AccountStatus, AccountUpdate, NewAccount};
use crate::ports::LedgerStore;

/// Demo accounts created by [`AccountService::seed`]
const SEED_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("Alice", "BG80BNBG96611020345678", "1000.00"),
    ("Bob", "BG10BNBG96611020345679", "250.00"),
    ("Carol", "BG29BNBG96611020345680", "500.00"),
];

pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    allow_seed: bool,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>, allow_seed: bool) -> Self {
        Self { store, allow_seed }
    }

    /// Create an ACTIVE account. A missing initial amount opens it at zero.
    pub fn create(
        &self,
        name: &str,
        iban: &str,
        initial_amount: Option<Decimal>,
    ) -> Result<Account> {
        let account = NewAccount::new(name, iban, initial_amount)?;
        let created = self.store.create_account(&account)?;
        info!(account_id = created.id, "account created");
        Ok(created)
    }

    /// Create several accounts atomically
    ///
    /// The whole batch is rejected if it is empty, if any entry is invalid,
    /// or if two entries share a name or IBAN.
    pub fn create_batch(&self, accounts: Vec<NewAccount>) -> Result<Vec<Account>> {
        if accounts.is_empty() {
            return Err(Error::validation("accounts", "At least one account is required"));
        }

        let mut names = HashSet::new();
        let mut ibans = HashSet::new();
        for account in &accounts {
            if !names.insert(account.name.as_str()) {
                return Err(Error::DuplicateName(account.name.clone()));
            }
            if !ibans.insert(account.iban.as_str()) {
                return Err(Error::DuplicateIban(account.iban.clone()));
            }
        }

        let created = self.store.create_accounts(&accounts)?;
        info!(count = created.len(), "accounts created");
        Ok(created)
    }

    /// Create the demo accounts, if seeding is enabled
    pub fn seed(&self) -> Result<Vec<Account>> {
        if !self.allow_seed {
            return Err(Error::SeedingDisabled);
        }
        let accounts = SEED_ACCOUNTS
            .iter()
            .map(|(name, iban, amount)| {
                let amount = amount
                    .parse::<Decimal>()
                    .map_err(|e| Error::InvalidAmount(e.to_string()))?;
                NewAccount::new(name, iban, Some(amount))
            })
            .collect::<Result<Vec<_>>>()?;
        self.create_batch(accounts)
    }

    pub fn get(&self, id: AccountId) -> Result<Account> {
        self.store.get_account(id)
    }

    /// Current available amount of one account
    pub fn available_amount(&self, id: AccountId) -> Result<Decimal> {
        Ok(self.store.get_account(id)?.available_amount)
    }

    /// Replace name and IBAN and set the balance to `available_amount`
    pub fn update(
        &self,
        id: AccountId,
        name: &str,
        iban: &str,
        available_amount: Decimal,
    ) -> Result<Account> {
        let update = AccountUpdate::new(name, iban, available_amount)?;
        let updated = self.store.update_account(id, &update)?;
        info!(account_id = id, "account updated");
        Ok(updated)
    }

    /// ACTIVE -> FROZEN; no-op when already frozen
    pub fn freeze(&self, id: AccountId) -> Result<Account> {
        self.set_status(id, AccountStatus::Frozen)
    }

    /// FROZEN -> ACTIVE; no-op when already active
    pub fn unfreeze(&self, id: AccountId) -> Result<Account> {
        self.set_status(id, AccountStatus::Active)
    }

    fn set_status(&self, id: AccountId, status: AccountStatus) -> Result<Account> {
        let account = self.store.update_account_status(id, status)?;
        info!(account_id = id, status = %account.status, "account status set");
        Ok(account)
    }

    /// Delete an account no transfer references
    pub fn delete(&self, id: AccountId) -> Result<()> {
        self.store.delete_account(id)?;
        info!(account_id = id, "account deleted");
        Ok(())
    }
}
