//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::account::AccountId;

/// Which side of a transfer an account sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Source,
    Destination,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Source => f.write_str("Source"),
            Party::Destination => f.write_str("Destination"),
        }
    }
}

/// Stable, caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidAmount,
    SameAccount,
    Validation,
    NotFound,
    AccountFrozen,
    InsufficientFunds,
    DuplicateIban,
    DuplicateName,
    AccountInUse,
    ConcurrencyConflict,
    Internal,
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{party} account {id} is frozen")]
    AccountFrozen { id: AccountId, party: Party },

    #[error("Insufficient funds in account {id}")]
    InsufficientFunds { id: AccountId },

    #[error("Account with IBAN '{0}' already exists")]
    DuplicateIban(String),

    #[error("Account with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Account {0} is referenced by transfers and cannot be deleted")]
    AccountInUse(AccountId),

    #[error("Concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Seeding is disabled")]
    SeedingDisabled,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a field-level validation error
    pub fn validation(field: &'static str, msg: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: msg.into(),
        }
    }

    pub fn account_not_found(id: AccountId) -> Self {
        Self::NotFound {
            entity: "Account",
            id,
        }
    }

    pub fn transfer_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Transfer",
            id,
        }
    }

    /// Classify the error for callers that must not see storage detail
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Error::SameAccount => ErrorKind::SameAccount,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } | Error::SeedingDisabled => ErrorKind::NotFound,
            Error::AccountFrozen { .. } => ErrorKind::AccountFrozen,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::DuplicateIban(_) => ErrorKind::DuplicateIban,
            Error::DuplicateName(_) => ErrorKind::DuplicateName,
            Error::AccountInUse(_) => ErrorKind::AccountInUse,
            Error::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Database(format!("lock poisoned: {}", err))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_message_names_the_account() {
        let err = Error::AccountFrozen {
            id: 7,
            party: Party::Destination,
        };
        assert_eq!(err.to_string(), "Destination account 7 is frozen");
        assert_eq!(err.kind(), ErrorKind::AccountFrozen);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        assert_eq!(Error::database("disk full").kind(), ErrorKind::Internal);
        assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
    }
}
