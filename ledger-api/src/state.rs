//! Shared application state

use std::sync::Arc;

use ledger_core::{Error, LedgerContext, LogEvent, LoggingService};
use tracing::warn;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<LedgerContext>,
    logger: Option<Arc<LoggingService>>,
}

impl AppState {
    pub fn new(ctx: Arc<LedgerContext>, logger: Option<Arc<LoggingService>>) -> Self {
        Self { ctx, logger }
    }

    /// Run a blocking ledger read on the blocking pool
    pub(crate) async fn read<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&LedgerContext) -> ledger_core::domain::result::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        let result = tokio::task::spawn_blocking(move || work(&ctx)).await?;
        Ok(result?)
    }

    /// Run a ledger mutation and record its outcome in the event log
    pub(crate) async fn mutate<T, F>(&self, operation: &'static str, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&LedgerContext) -> ledger_core::domain::result::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        let logger = self.logger.clone();
        let result = tokio::task::spawn_blocking(move || {
            let result = work(&ctx);
            if let Some(logger) = logger {
                record(&logger, operation, result.as_ref().err());
            }
            result
        })
        .await?;
        Ok(result?)
    }
}

/// Event log failures never fail the request
fn record(logger: &LoggingService, operation: &str, error: Option<&Error>) {
    let event = match error {
        None => LogEvent::new("operation_succeeded").with_operation(operation),
        Some(err) => LogEvent::new("operation_failed")
            .with_operation(operation)
            .with_error(err),
    };
    if let Err(e) = logger.log(event) {
        warn!(operation, "failed to write event log: {}", e);
    }
}
