//! Transfer domain model
//!
//! A successful transfer is recorded as two rows: a DEBIT owned by the
//! source account and a CREDIT owned by the destination, both carrying the
//! same amount and each pointing at the other side as beneficiary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::money::positive_amount;
use super::result::{Error, Result};

pub type TransferId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferType {
    Debit,
    Credit,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::Debit => "DEBIT",
            TransferType::Credit => "CREDIT",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "DEBIT" => Ok(TransferType::Debit),
            "CREDIT" => Ok(TransferType::Credit),
            other => Err(Error::database(format!("unknown transfer type '{}'", other))),
        }
    }
}

/// One side of a money movement, owned by `account_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub account_id: AccountId,
    pub beneficiary_account_id: AccountId,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    pub amount: Decimal,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

/// The DEBIT/CREDIT rows written by one transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferPair {
    pub debit: Transfer,
    pub credit: Transfer,
}

impl TransferPair {
    /// True when the two rows mirror each other
    pub fn is_matched(&self) -> bool {
        self.debit.transfer_type == TransferType::Debit
            && self.credit.transfer_type == TransferType::Credit
            && self.debit.amount == self.credit.amount
            && self.debit.account_id == self.credit.beneficiary_account_id
            && self.credit.account_id == self.debit.beneficiary_account_id
    }
}

/// A validated request to move `amount` from one account to another
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOrder {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
    pub idempotency_key: Option<String>,
}

impl TransferOrder {
    /// Amount is checked before the accounts, so a zero self-transfer is an
    /// amount error.
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> Result<Self> {
        let amount = positive_amount(amount)?;
        if from == to {
            return Err(Error::SameAccount);
        }
        Ok(Self {
            from,
            to,
            amount,
            idempotency_key: None,
        })
    }

    /// Attach a client-supplied replay key. Blank keys are ignored.
    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    /// Unsaved DEBIT and CREDIT rows for this order
    pub fn legs(&self) -> (NewTransfer, NewTransfer) {
        let debit = NewTransfer {
            account_id: self.from,
            beneficiary_account_id: self.to,
            transfer_type: TransferType::Debit,
            amount: self.amount,
            idempotency_key: self.idempotency_key.clone(),
        };
        let credit = NewTransfer {
            account_id: self.to,
            beneficiary_account_id: self.from,
            transfer_type: TransferType::Credit,
            amount: self.amount,
            idempotency_key: self.idempotency_key.clone(),
        };
        (debit, credit)
    }
}

/// A transfer row before the store assigns its id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub account_id: AccountId,
    pub beneficiary_account_id: AccountId,
    pub transfer_type: TransferType,
    pub amount: Decimal,
    pub idempotency_key: Option<String>,
}

/// Result of executing a [`TransferOrder`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub pair: TransferPair,
    /// True when an earlier transfer with the same idempotency key was returned
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_rejects_non_positive_amount() {
        assert!(matches!(TransferOrder::new(1, 2, dec!(0)), Err(Error::InvalidAmount(_))));
        assert!(matches!(TransferOrder::new(1, 2, dec!(-3)), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_order_rejects_same_account() {
        assert!(matches!(TransferOrder::new(4, 4, dec!(10)), Err(Error::SameAccount)));
    }

    #[test]
    fn test_amount_checked_before_accounts() {
        assert!(matches!(TransferOrder::new(4, 4, dec!(0)), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_blank_idempotency_key_is_dropped() {
        let order = TransferOrder::new(1, 2, dec!(1))
            .unwrap()
            .with_idempotency_key(Some("  ".into()));
        assert_eq!(order.idempotency_key, None);
    }

    #[test]
    fn test_legs_mirror_each_other() {
        let order = TransferOrder::new(1, 2, dec!(40)).unwrap();
        let (debit, credit) = order.legs();
        assert_eq!(debit.account_id, 1);
        assert_eq!(debit.beneficiary_account_id, 2);
        assert_eq!(debit.transfer_type, TransferType::Debit);
        assert_eq!(credit.account_id, 2);
        assert_eq!(credit.beneficiary_account_id, 1);
        assert_eq!(credit.transfer_type, TransferType::Credit);
        assert_eq!(debit.amount.to_string(), "40.00");
    }

    #[test]
    fn test_transfer_serializes_type_field() {
        let now = Utc::now();
        let transfer = Transfer {
            id: 9,
            account_id: 1,
            beneficiary_account_id: 2,
            transfer_type: TransferType::Debit,
            amount: dec!(40.00),
            created_on: now,
            modified_on: now,
            idempotency_key: Some("k".into()),
        };
        let json = serde_json::to_value(&transfer).unwrap();
        assert_eq!(json["type"], "DEBIT");
        assert_eq!(json["beneficiaryAccountId"], 2);
        assert!(json.get("idempotencyKey").is_none());
    }
}
