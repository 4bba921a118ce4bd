//! Port definitions (hexagonal architecture)
//!
//! The services depend only on these traits, not on the DuckDB adapter.

mod ledger;

pub use ledger::{LedgerStore, LedgerSummary, TransferGuard};
