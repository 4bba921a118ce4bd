//! Transfer service - moves funds between two accounts

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::result::{Error, Party, Result};
use crate::domain::{Account, AccountId, TransferOrder, TransferPair, TransferReceipt};
use crate::ports::LedgerStore;

/// Checks run against both accounts while they are locked
///
/// Order matters: a frozen source is reported before a frozen destination,
/// and both before insufficient funds.
pub fn ensure_transferable(from: &Account, to: &Account, amount: Decimal) -> Result<()> {
    if !from.is_active() {
        return Err(Error::AccountFrozen {
            id: from.id,
            party: Party::Source,
        });
    }
    if !to.is_active() {
        return Err(Error::AccountFrozen {
            id: to.id,
            party: Party::Destination,
        });
    }
    if !from.can_cover(amount) {
        return Err(Error::InsufficientFunds { id: from.id });
    }
    Ok(())
}

pub struct TransferService {
    store: Arc<dyn LedgerStore>,
}

impl TransferService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Move `amount` from one account to another, returning the DEBIT/CREDIT pair
    pub fn transfer(&self, from: AccountId, to: AccountId, amount: Decimal) -> Result<TransferPair> {
        Ok(self.submit(TransferOrder::new(from, to, amount)?)?.pair)
    }

    /// Execute a validated order. An order carrying an idempotency key that
    /// was already used by the same source account returns the earlier pair.
    pub fn submit(&self, order: TransferOrder) -> Result<TransferReceipt> {
        let amount = order.amount;
        let receipt = self
            .store
            .execute_transfer(&order, &|from: &Account, to: &Account| {
                ensure_transferable(from, to, amount)
            })?;

        if receipt.replayed {
            debug!(debit_id = receipt.pair.debit.id, "transfer replayed");
        } else {
            info!(
                from = order.from,
                to = order.to,
                debit_id = receipt.pair.debit.id,
                credit_id = receipt.pair.credit.id,
                "transfer completed"
            );
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn account(id: AccountId, status: AccountStatus, amount: Decimal) -> Account {
        let now = Utc::now();
        Account {
            id,
            name: format!("account-{}", id),
            iban: format!("BG80BNBG{:014}", id),
            status,
            available_amount: amount,
            created_on: now,
            modified_on: now,
        }
    }

    #[test]
    fn test_frozen_source_reported_first() {
        let from = account(1, AccountStatus::Frozen, dec!(0));
        let to = account(2, AccountStatus::Frozen, dec!(0));
        let err = ensure_transferable(&from, &to, dec!(10)).unwrap_err();
        assert!(matches!(err, Error::AccountFrozen { id: 1, party: Party::Source }));
    }

    #[test]
    fn test_frozen_destination() {
        let from = account(1, AccountStatus::Active, dec!(100));
        let to = account(2, AccountStatus::Frozen, dec!(0));
        let err = ensure_transferable(&from, &to, dec!(10)).unwrap_err();
        assert!(matches!(err, Error::AccountFrozen { id: 2, party: Party::Destination }));
    }

    #[test]
    fn test_frozen_checked_before_funds() {
        let from = account(1, AccountStatus::Active, dec!(5));
        let to = account(2, AccountStatus::Frozen, dec!(0));
        let err = ensure_transferable(&from, &to, dec!(10)).unwrap_err();
        assert!(matches!(err, Error::AccountFrozen { .. }));
    }

    #[test]
    fn test_exact_balance_is_enough() {
        let from = account(1, AccountStatus::Active, dec!(10.00));
        let to = account(2, AccountStatus::Active, dec!(0));
        assert!(ensure_transferable(&from, &to, dec!(10)).is_ok());
        assert!(matches!(
            ensure_transferable(&from, &to, dec!(10.01)),
            Err(Error::InsufficientFunds { id: 1 })
        ));
    }
}
