//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::iban::normalize_iban;
use super::money::non_negative_amount;
use super::result::{Error, Result};

/// Account identifier, assigned by the store on creation
pub type AccountId = i64;

/// Lifecycle state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Frozen,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "FROZEN" => Ok(AccountStatus::Frozen),
            other => Err(Error::database(format!("unknown account status '{}'", other))),
        }
    }
}

/// A named holder of funds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub iban: String,
    pub status: AccountStatus,
    /// Never negative; held at two decimal places
    pub available_amount: Decimal,
    pub created_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.available_amount >= amount
    }
}

fn required_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    Ok(name.to_string())
}

/// Validated input for creating an account
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub iban: String,
    pub initial_amount: Decimal,
}

impl NewAccount {
    /// Validate raw input. A missing initial amount opens the account at zero.
    pub fn new(name: &str, iban: &str, initial_amount: Option<Decimal>) -> Result<Self> {
        Ok(Self {
            name: required_name(name)?,
            iban: normalize_iban(iban)?,
            initial_amount: non_negative_amount(initial_amount.unwrap_or(Decimal::ZERO))?,
        })
    }
}

/// Validated replacement of an account's editable fields
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub name: String,
    pub iban: String,
    pub available_amount: Decimal,
}

impl AccountUpdate {
    pub fn new(name: &str, iban: &str, available_amount: Decimal) -> Result<Self> {
        Ok(Self {
            name: required_name(name)?,
            iban: normalize_iban(iban)?,
            available_amount: non_negative_amount(available_amount)?,
        })
    }
}
