//! CLI command implementations

pub mod accounts;
pub mod logs;
pub mod seed;
pub mod serve;
pub mod status;
pub mod transfer;
pub mod transfers;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use ledger_core::{EntryPoint, Error, LedgerContext, LogEvent, LoggingService};

/// Get the logging service for the given entry point
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Option<LoggingService> {
    let ledger_dir = get_ledger_dir().ok()?;
    std::fs::create_dir_all(&ledger_dir).ok()?;
    LoggingService::new(&ledger_dir, entry_point, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Run a ledger mutation and record its outcome in the CLI event log
pub fn logged<T>(operation: &str, work: impl FnOnce() -> ledger_core::domain::result::Result<T>) -> Result<T> {
    let logger = get_logger(EntryPoint::Cli);
    let result = work();
    let event = match &result {
        Ok(_) => LogEvent::new("operation_succeeded").with_operation(operation),
        Err(e) => LogEvent::new("operation_failed")
            .with_operation(operation)
            .with_error(e),
    };
    log_event(&logger, event);
    result.map_err(describe)
}

/// Attach the error kind to a core error for display
pub fn describe(err: Error) -> anyhow::Error {
    anyhow!("{} ({:?})", err, err.kind())
}

/// Get the ledger directory from environment or default
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ledger"))
        .context("Could not find home directory; set LEDGER_DIR")
}

/// Open the ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;

    std::fs::create_dir_all(&ledger_dir)
        .with_context(|| format!("Failed to create ledger directory: {:?}", ledger_dir))?;

    LedgerContext::new(&ledger_dir).context("Failed to initialize ledger context")
}
