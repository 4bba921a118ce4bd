//! API Routes

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/status", get(handlers::status))
        // Accounts
        .route(
            "/api/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/api/accounts/batch", post(handlers::create_accounts))
        .route("/api/accounts/seed", post(handlers::seed_accounts))
        .route(
            "/api/accounts/:id",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route("/api/accounts/:id/freeze", put(handlers::freeze_account))
        .route("/api/accounts/:id/unfreeze", put(handlers::unfreeze_account))
        // Transfers
        .route(
            "/api/transfers",
            get(handlers::list_transfers).post(handlers::create_transfer),
        )
        .route(
            "/api/transfers/account/:id",
            get(handlers::list_account_transfers),
        )
        .route("/api/transfers/:id", get(handlers::get_transfer))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
