pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod rate_limit;
pub mod services;
pub mod startup;
pub mod telemetry;
pub mod utils;
pub mod validation;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::config::StoreUrls;
use crate::domain::OrderStatus;
use crate::gateway::PaymentApiClient;
use crate::ports::{OrderStore, TransactionLog};
use crate::services::{CheckoutService, NonceService, Reconciler};

#[derive(Clone)]
pub struct AppState {
    pub api_client: Arc<PaymentApiClient>,
    pub reconciler: Arc<Reconciler>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<dyn OrderStore>,
    pub transaction_log: Arc<dyn TransactionLog>,
    pub nonces: NonceService,
    pub admin_api_key: Option<String>,
}

impl AppState {
    /// Wires the services around one client and one pair of stores.
    pub fn new(
        api_client: Arc<PaymentApiClient>,
        orders: Arc<dyn OrderStore>,
        transaction_log: Arc<dyn TransactionLog>,
        store_urls: StoreUrls,
        post_payment_status: OrderStatus,
        nonces: NonceService,
        admin_api_key: Option<String>,
    ) -> Self {
        let reconciler = Reconciler::new(
            api_client.clone(),
            orders.clone(),
            transaction_log.clone(),
            store_urls,
            post_payment_status,
        );
        let checkout = CheckoutService::new(
            api_client.clone(),
            orders.clone(),
            transaction_log.clone(),
        );

        Self {
            api_client,
            reconciler: Arc::new(reconciler),
            checkout: Arc::new(checkout),
            orders,
            transaction_log,
            nonces,
            admin_api_key,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/nonce", get(handlers::admin::issue_nonce))
        .route(
            "/admin/transaction-status",
            post(handlers::admin::transaction_status),
        )
        .route(
            "/admin/transactions/:merchant_transaction_id",
            get(handlers::admin::get_transaction),
        )
        .route(
            "/admin/orders/:order_id/reconcile",
            post(handlers::admin::reconcile_order),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/mypay/callback", get(handlers::webhook::callback))
        .route("/checkout/:order_id", post(handlers::checkout::process_payment))
        .merge(admin)
        .layer(from_fn(middleware::request_logger::request_logger_middleware))
        .with_state(state)
}
