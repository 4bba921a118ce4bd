//! API Handlers

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use ledger_core::domain::NewAccount;
use ledger_core::{AccountId, TransferId, TransferOrder};

use crate::error::ApiError;
use crate::state::AppState;

pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

// ============ Request Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub name: String,
    pub iban: String,
    #[serde(default)]
    pub initial_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub name: String,
    pub iban: String,
    pub available_amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
}

// ============ Status ============

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.read(|ctx| ctx.query_service.summary()).await?;
    Ok(Json(summary))
}

// ============ Accounts ============

pub async fn list_accounts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.read(|ctx| ctx.query_service.list_accounts()).await?;
    Ok(Json(accounts))
}

pub async fn get_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let account = state.read(move |ctx| ctx.query_service.get_account(id)).await?;
    Ok(Json(account))
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let account = state
        .mutate("create_account", move |ctx| {
            ctx.account_service
                .create(&req.name, &req.iban, req.initial_amount)
        })
        .await?;
    Ok(Json(account))
}

/// Create a list of accounts in one transaction
pub async fn create_accounts(
    State(state): State<AppState>,
    payload: Result<Json<Vec<CreateAccountRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(requests) = payload?;
    let accounts = state
        .mutate("create_accounts", move |ctx| {
            let accounts = requests
                .iter()
                .map(|r| NewAccount::new(&r.name, &r.iban, r.initial_amount))
                .collect::<ledger_core::domain::result::Result<Vec<_>>>()?;
            ctx.account_service.create_batch(accounts)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(accounts)))
}

pub async fn seed_accounts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let accounts = state
        .mutate("seed_accounts", |ctx| ctx.account_service.seed())
        .await?;
    Ok((StatusCode::CREATED, Json(accounts)))
}

pub async fn update_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let account = state
        .mutate("update_account", move |ctx| {
            ctx.account_service
                .update(id, &req.name, &req.iban, req.available_amount)
        })
        .await?;
    Ok(Json(account))
}

pub async fn freeze_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let account = state
        .mutate("freeze_account", move |ctx| ctx.account_service.freeze(id))
        .await?;
    Ok(Json(account))
}

pub async fn unfreeze_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let account = state
        .mutate("unfreeze_account", move |ctx| ctx.account_service.unfreeze(id))
        .await?;
    Ok(Json(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    state
        .mutate("delete_account", move |ctx| ctx.account_service.delete(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Transfers ============

pub async fn list_transfers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let transfers = state.read(|ctx| ctx.query_service.list_transfers()).await?;
    Ok(Json(transfers))
}

pub async fn list_account_transfers(
    State(state): State<AppState>,
    path: Result<Path<AccountId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let transfers = state
        .read(move |ctx| ctx.query_service.list_account_transfers(id))
        .await?;
    Ok(Json(transfers))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    path: Result<Path<TransferId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let transfer = state.read(move |ctx| ctx.query_service.get_transfer(id)).await?;
    Ok(Json(transfer))
}

/// Execute a transfer and return its DEBIT record
///
/// 201 for a new transfer, 200 when an `Idempotency-Key` replays an earlier one.
pub async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let key = headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let receipt = state
        .mutate("create_transfer", move |ctx| {
            let order = TransferOrder::new(req.from_account_id, req.to_account_id, req.amount)?
                .with_idempotency_key(key);
            ctx.transfer_service.submit(order)
        })
        .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt.pair.debit)))
}
