//! Service layer - business logic orchestration
//!
//! Services validate input, then hand the work to the [`LedgerStore`] port.
//!
//! [`LedgerStore`]: crate::ports::LedgerStore

mod account;
pub mod logging;
pub mod migration;
mod query;
pub mod transfer;

pub use account::AccountService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use query::QueryService;
pub use transfer::TransferService;
