//! Integration tests for the API client against a mock server

use std::time::Duration;

use rediscloud_api::databases::DatabaseHandler;
use rediscloud_api::subscriptions::SubscriptionHandler;
use rediscloud_api::{ClientConfig, CloudClient, CloudError};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> CloudClient {
    let mut config = ClientConfig::new("test-access-key", "test-secret-key")
        .with_api_url(server.uri());
    config.backoff = Duration::from_millis(1);
    CloudClient::new(config).expect("client builds")
}

#[tokio::test]
async fn sends_api_key_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(header("x-api-key", "test-access-key"))
        .and(header("x-api-secret-key", "test-secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subscriptions": [{"id": 1, "name": "prod", "status": "active"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handler = SubscriptionHandler::new(test_client(&server));
    let subs = handler.list().await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].name.as_deref(), Some("prod"));
}

#[tokio::test]
async fn maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/42"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"message": "subscription 42 not found"})),
        )
        .mount(&server)
        .await;

    let handler = SubscriptionHandler::new(test_client(&server));
    let err = handler.get(42).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("subscription 42 not found"));
}

#[tokio::test]
async fn maps_409_to_conflict_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/42/databases/7"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "SUBSCRIPTION_NOT_ACTIVE"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handler = DatabaseHandler::new(test_client(&server));
    let err = handler.delete(42, 7).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn retries_rate_limited_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/9"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"message": "slow down"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 9, "name": "prod", "status": "active"})),
        )
        .mount(&server)
        .await;

    let handler = SubscriptionHandler::new(test_client(&server));
    let sub = handler.get(9).await.unwrap();
    assert_eq!(sub.id, Some(9));
}

#[tokio::test]
async fn surfaces_400_message_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions/1/databases"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "DATABASE_INVALID_CERT"})),
        )
        .mount(&server)
        .await;

    let handler = DatabaseHandler::new(test_client(&server));
    let request = rediscloud_api::databases::DatabaseCreateRequest {
        name: "cache".to_string(),
        ..Default::default()
    };
    let err = handler.create(1, &request).await.unwrap_err();
    match err {
        CloudError::BadRequest { message } => assert_eq!(message, "DATABASE_INVALID_CERT"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn create_returns_task_pointer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "7945cdd4-8b30-47cf-be3b-92b5a72fa0a6",
            "commandType": "subscriptionCreateRequest",
            "status": "received"
        })))
        .mount(&server)
        .await;

    let handler = SubscriptionHandler::new(test_client(&server));
    let request = rediscloud_api::subscriptions::SubscriptionCreateRequest {
        name: "prod".to_string(),
        ..Default::default()
    };
    let task = handler.create(&request).await.unwrap();
    assert_eq!(
        task.task_id.as_deref(),
        Some("7945cdd4-8b30-47cf-be3b-92b5a72fa0a6")
    );
}
