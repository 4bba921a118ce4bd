//! HTTP contract tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot` against an
//! in-memory ledger.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ledger_api::{create_router, AppState, IDEMPOTENCY_KEY};
use ledger_core::config::Config;
use ledger_core::{EntryPoint, LedgerContext, LoggingService};

const IBAN_A: &str = "BG80BNBG96611020345678";
const IBAN_B: &str = "GB29NWBK60161331926819";

fn app_with(config: Config) -> Router {
    let ctx = LedgerContext::in_memory(config).expect("Failed to create ledger");
    create_router(AppState::new(Arc::new(ctx), None))
}

fn app() -> Router {
    app_with(Config::default())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, &[]).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), &[]).await
}

async fn put(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, body, &[]).await
}

async fn create_account(app: &Router, name: &str, iban: &str, amount: Value) -> i64 {
    let (status, body) = post(
        app,
        "/api/accounts",
        json!({ "name": name, "iban": iban, "initialAmount": amount }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn transfer(app: &Router, from: i64, to: i64, amount: Value) -> (StatusCode, Value) {
    post(
        app,
        "/api/transfers",
        json!({ "fromAccountId": from, "toAccountId": to, "amount": amount }),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_transfer_scenario() {
    let app = app();
    let a = create_account(&app, "A", IBAN_A, json!(100.00)).await;
    let b = create_account(&app, "B", IBAN_B, json!("0.00")).await;

    let (status, debit) = transfer(&app, a, b, json!(40.00)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(debit["type"], "DEBIT");
    assert_eq!(debit["accountId"], a);
    assert_eq!(debit["beneficiaryAccountId"], b);
    assert_eq!(debit["amount"], "40.00");

    let (_, account_a) = get(&app, &format!("/api/accounts/{}", a)).await;
    let (_, account_b) = get(&app, &format!("/api/accounts/{}", b)).await;
    assert_eq!(account_a["availableAmount"], "60.00");
    assert_eq!(account_b["availableAmount"], "40.00");

    let (status, rows) = get(&app, "/api/transfers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let (_, credits) = get(&app, &format!("/api/transfers/account/{}", b)).await;
    let credits = credits.as_array().unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0]["type"], "CREDIT");
    assert_eq!(credits[0]["beneficiaryAccountId"], a);

    let credit_id = credits[0]["id"].as_i64().unwrap();
    let (status, credit) = get(&app, &format!("/api/transfers/{}", credit_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(credit["createdOn"], debit["createdOn"]);
}

#[tokio::test]
async fn test_transfer_errors() {
    let app = app();
    let a = create_account(&app, "A", IBAN_A, json!(60)).await;
    let b = create_account(&app, "B", IBAN_B, json!(0)).await;

    let (status, body) = transfer(&app, a, a, json!(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SAME_ACCOUNT");

    let (status, body) = transfer(&app, a, b, json!(0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");
    assert!(body["errors"]["amount"].is_string());

    let (status, body) = transfer(&app, a, 999, json!(1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, body) = transfer(&app, a, b, json!(1000.00)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");

    let (status, _) = put(&app, &format!("/api/accounts/{}/freeze", a), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = transfer(&app, a, b, json!(10.00)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ACCOUNT_FROZEN");
    assert!(body["message"].as_str().unwrap().contains("frozen"));

    let (_, account_a) = get(&app, &format!("/api/accounts/{}", a)).await;
    assert_eq!(account_a["availableAmount"], "60.00");
    assert_eq!(account_a["status"], "FROZEN");
    let (_, rows) = get(&app, "/api/transfers").await;
    assert!(rows.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_idempotent_transfer_replay() {
    let app = app();
    let a = create_account(&app, "A", IBAN_A, json!(100)).await;
    let b = create_account(&app, "B", IBAN_B, json!(0)).await;
    let body = json!({ "fromAccountId": a, "toAccountId": b, "amount": "25.00" });

    let (first_status, first) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(body.clone()),
        &[(IDEMPOTENCY_KEY, "pay-1")],
    )
    .await;
    let (second_status, second) = send(
        &app,
        Method::POST,
        "/api/transfers",
        Some(body),
        &[(IDEMPOTENCY_KEY, "pay-1")],
    )
    .await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let (_, account_a) = get(&app, &format!("/api/accounts/{}", a)).await;
    assert_eq!(account_a["availableAmount"], "75.00");
}

#[tokio::test]
async fn test_account_validation() {
    let app = app();
    create_account(&app, "A", IBAN_A, json!(1)).await;

    let (status, body) = post(&app, "/api/accounts", json!({ "name": "B", "iban": IBAN_A })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_IBAN");

    let (status, body) = post(&app, "/api/accounts", json!({ "name": "A", "iban": IBAN_B })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_NAME");

    let (status, body) = post(&app, "/api/accounts", json!({ "name": "C", "iban": "12345" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["iban"], "Invalid IBAN format");

    let (status, body) = post(&app, "/api/accounts", json!({ "name": " ", "iban": IBAN_B })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["name"].is_string());

    let (status, body) = post(
        &app,
        "/api/accounts",
        json!({ "name": "C", "iban": IBAN_B, "initialAmount": -1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    let (status, body) = post(&app, "/api/accounts", json!({ "name": "C" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (_, accounts) = get(&app, "/api/accounts").await;
    assert_eq!(accounts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_amounts_beyond_storage_are_rejected() {
    let app = app();
    let (status, body) = post(
        &app,
        "/api/accounts",
        json!({ "name": "A", "iban": IBAN_A, "initialAmount": "100000000000000000" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    let rich = create_account(&app, "A", IBAN_A, json!("9999999999999999.99")).await;
    let payer = create_account(&app, "B", IBAN_B, json!("1.00")).await;

    let (status, body) = transfer(&app, payer, rich, json!("0.01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    let (_, account) = get(&app, &format!("/api/accounts/{}", rich)).await;
    assert_eq!(account["availableAmount"], "9999999999999999.99");
    let (_, transfers) = get(&app, "/api/transfers").await;
    assert!(transfers.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_and_path() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/transfers")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/accounts/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");

    let (status, body) = get(&app, "/api/accounts/77").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Account not found with id: 77");
}

#[tokio::test]
async fn test_update_and_unfreeze() {
    let app = app();
    let a = create_account(&app, "A", IBAN_A, json!(10)).await;

    let (status, body) = put(
        &app,
        &format!("/api/accounts/{}", a),
        Some(json!({ "name": "Alpha", "iban": IBAN_B, "availableAmount": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alpha");
    assert_eq!(body["availableAmount"], "12.50");

    let (status, body) = put(
        &app,
        &format!("/api/accounts/{}", a),
        Some(json!({ "name": "Alpha", "iban": IBAN_B, "availableAmount": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    put(&app, &format!("/api/accounts/{}/freeze", a), None).await;
    let (status, body) = put(&app, &format!("/api/accounts/{}/unfreeze", a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");

    let (status, _) = put(&app, "/api/accounts/404/freeze", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_account() {
    let app = app();
    let a = create_account(&app, "A", IBAN_A, json!(10)).await;
    let b = create_account(&app, "B", IBAN_B, json!(0)).await;
    let c = create_account(&app, "C", "DE89370400440532013000", json!(0)).await;
    transfer(&app, a, b, json!(5)).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/accounts/{}", a), None, &[]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ACCOUNT_IN_USE");

    let (status, body) = send(&app, Method::DELETE, &format!("/api/accounts/{}", c), None, &[]).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/accounts/{}", c), None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_create() {
    let app = app();
    let (status, body) = post(
        &app,
        "/api/accounts/batch",
        json!([
            { "name": "A", "iban": IBAN_A, "initialAmount": 5 },
            { "name": "B", "iban": IBAN_B }
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[1]["availableAmount"], "0.00");

    let (status, body) = post(&app, "/api/accounts/batch", json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["accounts"].is_string());

    let (status, _) = post(
        &app,
        "/api/accounts/batch",
        json!([
            { "name": "C", "iban": "DE89370400440532013000" },
            { "name": "D", "iban": "DE89370400440532013000" }
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, accounts) = get(&app, "/api/accounts").await;
    assert_eq!(accounts.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_seed_and_status() {
    let (status, _) = post(&app(), "/api/accounts/seed", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let app = app_with(Config {
        allow_seed: true,
        ..Config::default()
    });
    let (status, body) = post(&app, "/api/accounts/seed", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, summary) = get(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["accounts"], 3);
    assert_eq!(summary["frozenAccounts"], 0);
    assert_eq!(summary["transferRecords"], 0);
    assert_eq!(summary["totalBalance"], "1750.00");
}

#[tokio::test]
async fn test_mutations_reach_event_log() {
    let ctx = LedgerContext::in_memory(Config::default()).unwrap();
    let logger = Arc::new(LoggingService::in_memory(EntryPoint::Server, "test").unwrap());
    let app = create_router(AppState::new(Arc::new(ctx), Some(Arc::clone(&logger))));

    let a = create_account(&app, "A", IBAN_A, json!(5)).await;
    let b = create_account(&app, "B", IBAN_B, json!(0)).await;
    transfer(&app, a, b, json!(9.99)).await;
    get(&app, "/api/accounts").await;

    let entries = logger.get_recent(10).unwrap();
    assert_eq!(entries.len(), 3);
    let errors = logger.get_errors(10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].operation.as_deref(), Some("create_transfer"));
    assert_eq!(errors[0].error_kind.as_deref(), Some("INSUFFICIENT_FUNDS"));
    assert!(!errors[0].error_message.as_deref().unwrap_or("").contains("9.99"));
    assert!(entries.iter().all(|e| e.entry_point == "server"));
}
