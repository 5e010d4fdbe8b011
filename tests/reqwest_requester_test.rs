use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use url::Url;

use mypay_gateway::gateway::{
    ApiClientError, ClientSettings, Credentials, Endpoints, HttpRequester, IdempotencyStrategy,
    PaymentApiClient, ReqwestRequester, RetryPolicy,
};
use mypay_gateway::rate_limit::SlidingWindowLimiter;

fn client_for(base: &str) -> PaymentApiClient {
    let settings = ClientSettings {
        endpoints: Endpoints::with_base(base),
        credentials: Credentials {
            api_key: "key-123".to_string(),
            merchant_id: "MERCHANT-1".to_string(),
            username: "shop-user".to_string(),
            password: "shop-pass".to_string(),
        },
        callback_url: Url::parse("https://shop.test/mypay/callback").unwrap(),
        retry: RetryPolicy::default(),
        idempotency: IdempotencyStrategy::PerAttempt,
    };
    PaymentApiClient::new(
        settings,
        Arc::new(ReqwestRequester::new().unwrap()),
        Arc::new(SlidingWindowLimiter::default()),
    )
}

#[tokio::test]
async fn test_status_check_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/use-mypay-payments-status")
        .match_header("api_key", "key-123")
        .match_header("content-type", "application/json")
        .match_header("x-request-id", Matcher::Regex("^mypay_".to_string()))
        .match_body(Matcher::Json(json!({"MerchantTransactionId": "M-1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": true, "Message": "Success", "Status": 1, "Remarks": "ok"}"#)
        .create_async()
        .await;

    let response = client_for(&server.url()).check_status("M-1").await.unwrap();

    assert_eq!(response.status_code(), Some(1));
    assert_eq!(response.remarks(), "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_processor_rejection_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/use-mypay-payments-status")
        .with_status(401)
        .with_body(r#"{"status": false, "Message": "Invalid API key"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server.url()).check_status("M-1").await.unwrap_err();

    assert!(matches!(
        err,
        ApiClientError::Api { status: 401, ref message } if message == "Invalid API key"
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_failure_is_a_transport_error() {
    let requester = ReqwestRequester::new().unwrap();
    let result = requester
        .post_json("http://127.0.0.1:1/api", &[], &json!({}))
        .await;
    assert!(result.is_err());
}
