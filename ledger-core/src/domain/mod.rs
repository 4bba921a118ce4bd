//! Core domain entities
//!
//! Pure data structures with validation logic. No I/O.

mod account;
pub mod iban;
pub mod money;
pub mod result;
mod transfer;

pub use account::{Account, AccountId, AccountStatus, AccountUpdate, NewAccount};
pub use transfer::{
    NewTransfer, Transfer, TransferId, TransferOrder, TransferPair, TransferReceipt, TransferType,
};
