#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Duration;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use url::Url;

use mypay_gateway::adapters::{MemoryOrderStore, MemoryTransactionLog};
use mypay_gateway::config::StoreUrls;
use mypay_gateway::domain::{NewTransaction, Order, OrderStatus, TransactionStatus};
use mypay_gateway::gateway::{
    ClientSettings, Credentials, Endpoints, HttpRequester, IdempotencyStrategy, PaymentApiClient,
    RawResponse, RetryPolicy, TransportFailure,
};
use mypay_gateway::ports::{meta, OrderStore, TransactionLog};
use mypay_gateway::rate_limit::{RateLimiter, SlidingWindowLimiter};
use mypay_gateway::services::{NonceService, Reconciler};
use mypay_gateway::AppState;

pub const API_BASE: &str = "https://mypay.test";
pub const STORE_URL: &str = "https://shop.test";
pub const ADMIN_KEY: &str = "admin-test-key";
pub const ORDER_ID: i64 = 42;
pub const MERCHANT_TXN: &str = "M-42";

pub enum Reply {
    Http(u16, String),
    Transport(String),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Http(status, body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Reply::Http(status, String::new())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Replays scripted replies in order and records every request.
#[derive(Default)]
pub struct ScriptedRequester {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRequester {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpRequester for ScriptedRequester {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<RawResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.clone(),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Http(status, body)) => Ok(RawResponse { status, body }),
            Some(Reply::Transport(message)) => Err(TransportFailure(message)),
            None => Err(TransportFailure("no scripted reply".to_string())),
        }
    }
}

pub fn status_reply(code: i64, remarks: &str) -> Reply {
    Reply::json(
        200,
        json!({
            "status": true,
            "Message": "Success",
            "Status": code,
            "Remarks": remarks,
            "MerchantTransactionId": MERCHANT_TXN,
        }),
    )
}

pub fn credentials() -> Credentials {
    Credentials {
        api_key: "key-123".to_string(),
        merchant_id: "MERCHANT-1".to_string(),
        username: "shop-user".to_string(),
        password: "shop-pass".to_string(),
    }
}

pub fn settings(idempotency: IdempotencyStrategy) -> ClientSettings {
    ClientSettings {
        endpoints: Endpoints::with_base(API_BASE),
        credentials: credentials(),
        callback_url: Url::parse("https://shop.test/mypay/callback").unwrap(),
        retry: RetryPolicy::default(),
        idempotency,
    }
}

pub fn client_with(
    requester: Arc<dyn HttpRequester>,
    limiter: Arc<dyn RateLimiter>,
    idempotency: IdempotencyStrategy,
) -> Arc<PaymentApiClient> {
    Arc::new(PaymentApiClient::new(settings(idempotency), requester, limiter))
}

pub fn client(requester: Arc<ScriptedRequester>) -> Arc<PaymentApiClient> {
    client_with(
        requester,
        Arc::new(SlidingWindowLimiter::default()),
        IdempotencyStrategy::PerAttempt,
    )
}

pub fn order(id: i64) -> Order {
    Order {
        id,
        order_number: id.to_string(),
        total: BigDecimal::from_str("1500.50").unwrap(),
        status: OrderStatus::Pending,
        transaction_id: None,
    }
}

pub fn store_urls() -> StoreUrls {
    StoreUrls::parse(STORE_URL).unwrap()
}

/// Order 42 awaiting payment, with its checkout already logged as `M-42`.
pub async fn seeded_stores() -> (Arc<MemoryOrderStore>, Arc<MemoryTransactionLog>) {
    let orders = Arc::new(MemoryOrderStore::new());
    let log = Arc::new(MemoryTransactionLog::new());

    orders.insert(order(ORDER_ID)).await;
    orders
        .update_meta(ORDER_ID, meta::MERCHANT_TRANSACTION_ID, MERCHANT_TXN)
        .await
        .unwrap();
    log.insert(NewTransaction {
        order_id: ORDER_ID,
        merchant_transaction_id: MERCHANT_TXN.to_string(),
        amount: BigDecimal::from_str("1500.50").unwrap(),
        status: TransactionStatus::Incomplete,
        request_payload: json!({"OrderId": "000042"}),
        response_payload: json!({"status": true, "Message": "ok"}),
    })
    .await
    .unwrap();

    (orders, log)
}

pub fn reconciler(
    requester: Arc<ScriptedRequester>,
    orders: Arc<dyn OrderStore>,
    log: Arc<dyn TransactionLog>,
    post_payment_status: OrderStatus,
) -> Reconciler {
    Reconciler::new(client(requester), orders, log, store_urls(), post_payment_status)
}

pub fn nonce_service() -> NonceService {
    NonceService::new("nonce-secret", Duration::hours(12))
}

pub fn app_state(
    requester: Arc<ScriptedRequester>,
    orders: Arc<MemoryOrderStore>,
    log: Arc<MemoryTransactionLog>,
) -> AppState {
    AppState::new(
        client(requester),
        orders,
        log,
        store_urls(),
        OrderStatus::Processing,
        nonce_service(),
        Some(ADMIN_KEY.to_string()),
    )
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
