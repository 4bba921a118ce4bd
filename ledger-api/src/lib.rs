//! HTTP API for the account ledger
//!
//! Handlers run ledger operations on the blocking thread pool; the
//! DuckDB-backed services are synchronous.

pub mod error;
mod handlers;
mod routes;
mod state;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use error::{status_for, ApiError, ErrorBody};
pub use handlers::IDEMPOTENCY_KEY;
pub use routes::create_router;
pub use state::AppState;

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "ledger API listening");
    }
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
