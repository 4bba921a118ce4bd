//! Serve command - run the HTTP API

use std::sync::Arc;

use anyhow::{Context, Result};
use ledger_api::AppState;
use ledger_core::{EntryPoint, LogEvent};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{get_context, get_logger, log_event};

pub fn run(bind: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let addr = bind.unwrap_or_else(|| ctx.config.bind.clone());

    let logger = get_logger(EntryPoint::Server);
    log_event(&logger, LogEvent::new("server_started"));
    let logger = logger.map(Arc::new);

    let state = AppState::new(Arc::new(ctx), logger.clone());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        ledger_api::serve(listener, state, shutdown_signal())
            .await
            .context("HTTP server failed")
    })?;

    if let Some(l) = &logger {
        if let Err(e) = l.log(LogEvent::new("server_stopped")) {
            warn!("failed to write event log: {}", e);
        }
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
