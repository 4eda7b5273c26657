use std::sync::Arc;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use ferrobank_api::app::{build_app, AppServices};
use ferrobank_infra::{
    CreditService, FixedRateProvider, InMemoryBankStore, LedgerService, LogNotifier,
};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod, in-memory store, ephemeral port.
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryBankStore::new());
        let notifier = Arc::new(LogNotifier);
        let services = AppServices {
            ledger: LedgerService::new(store.clone(), notifier.clone()),
            credits: CreditService::new(
                store,
                Arc::new(FixedRateProvider::new(Decimal::from(16))),
                notifier,
            ),
        };

        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn open_account(client: &reqwest::Client, base_url: &str) -> serde_json::Value {
    let res = client
        .post(format!("{}/accounts", base_url))
        .json(&json!({
            "owner_id": uuid::Uuid::now_v7(),
            "currency": "RUB",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn account_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let account = open_account(&client, &server.base_url).await;
    assert_eq!(account["balance"], json!("0.00"));
    let id = account["id"].as_str().unwrap();

    // Deposit.
    let res = client
        .post(format!("{}/accounts/{}/balance", server.base_url, id))
        .json(&json!({ "amount": "150.00", "description": "salary" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tx: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tx["kind"], json!("deposit"));
    assert_eq!(tx["amount"], json!("150.00"));

    // Overdraw is refused with a typed error.
    let res = client
        .post(format!("{}/accounts/{}/balance", server.base_url, id))
        .json(&json!({ "amount": "-200.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], json!("insufficient_funds"));

    // Balance reflects only the committed deposit.
    let res = client
        .get(format!("{}/accounts/{}", server.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let account: serde_json::Value = res.json().await.unwrap();
    assert_eq!(account["balance"], json!("150.00"));

    // And the log holds exactly that one transaction.
    let res = client
        .get(format!("{}/accounts/{}/transactions", server.base_url, id))
        .send()
        .await
        .unwrap();
    let log: serde_json::Value = res.json().await.unwrap();
    assert_eq!(log["items"].as_array().unwrap().len(), 1);

    // Unknown account is a 404.
    let res = client
        .get(format!("{}/accounts/{}", server.base_url, uuid::Uuid::now_v7()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transfer_over_http_records_signed_legs() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let from = open_account(&client, &server.base_url).await;
    let to = open_account(&client, &server.base_url).await;
    let from_id = from["id"].as_str().unwrap();
    let to_id = to["id"].as_str().unwrap();

    client
        .post(format!("{}/accounts/{}/balance", server.base_url, from_id))
        .json(&json!({ "amount": "100.00" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/transfers", server.base_url))
        .json(&json!({
            "from_account_id": from_id,
            "to_account_id": to_id,
            "amount": "40.00",
            "description": "rent",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let receipt: serde_json::Value = res.json().await.unwrap();
    assert_eq!(receipt["debit"]["amount"], json!("-40.00"));
    assert_eq!(receipt["credit"]["amount"], json!("40.00"));
    assert_eq!(receipt["debit"]["kind"], json!("transfer"));

    // Same-account transfer is a validation error.
    let res = client
        .post(format!("{}/transfers", server.base_url))
        .json(&json!({
            "from_account_id": from_id,
            "to_account_id": from_id,
            "amount": "1.00",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn credit_origination_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let account = open_account(&client, &server.base_url).await;
    let account_id = account["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/credits", server.base_url))
        .json(&json!({
            "account_id": account_id,
            "principal": "120000.00",
            "term_months": 12,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let credit: serde_json::Value = res.json().await.unwrap();
    assert_eq!(credit["status"], json!("active"));
    // Reference rate 16 plus the 5pp lending margin.
    assert_eq!(credit["interest_rate"], json!("21"));
    let credit_id = credit["id"].as_str().unwrap();

    // Disbursement hit the account in the same unit.
    let res = client
        .get(format!("{}/accounts/{}", server.base_url, account_id))
        .send()
        .await
        .unwrap();
    let account: serde_json::Value = res.json().await.unwrap();
    assert_eq!(account["balance"], json!("120000.00"));

    let res = client
        .get(format!("{}/credits/{}/schedule", server.base_url, credit_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let schedule: serde_json::Value = res.json().await.unwrap();
    let items = schedule["items"].as_array().unwrap();
    assert_eq!(items.len(), 12);
    assert!(items.iter().all(|e| e["status"] == json!("pending")));

    // Term bounds come back as validation errors.
    let res = client
        .post(format!("{}/credits", server.base_url))
        .json(&json!({
            "account_id": account_id,
            "principal": "1000.00",
            "term_months": 0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unknown account cannot borrow.
    let res = client
        .post(format!("{}/credits", server.base_url))
        .json(&json!({
            "account_id": uuid::Uuid::now_v7(),
            "principal": "1000.00",
            "term_months": 6,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
