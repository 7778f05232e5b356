//! End-to-end lifecycle tests against a mock management API

use std::sync::Arc;
use std::time::Duration;

use rediscloud_api::{ClientConfig, CloudClient};
use rediscloud_provider::active_active::{
    ActiveActiveDatabaseConfig, ActiveActiveDatabaseResource, GlobalSettings, RegionOverride,
};
use rediscloud_provider::database::{DatabaseConfig, DatabaseResource, Protocol};
use rediscloud_provider::plan::{CreationPlan, MemoryStorage, Throughput, ThroughputBy};
use rediscloud_provider::subscription::{
    CloudProvider, CloudProviderConfig, PaymentMethod, RegionConfig, SubscriptionConfig,
    SubscriptionResource,
};
use rediscloud_provider::{Provider, ResourceTimeouts, SubscriptionId};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_provider(server: &MockServer) -> Arc<Provider> {
    let mut config =
        ClientConfig::new("test-access-key", "test-secret-key").with_api_url(server.uri());
    config.backoff = Duration::from_millis(1);
    let client = CloudClient::new(config).expect("client builds");
    let timeouts = ResourceTimeouts {
        subscription_create: Duration::from_secs(5),
        subscription_change: Duration::from_secs(5),
        database: Duration::from_secs(5),
        peering: Duration::from_secs(5),
        psc_create: Duration::from_secs(5),
        cloud_account_create: Duration::from_secs(5),
        cloud_account_activate: Duration::from_secs(5),
        read: Duration::from_secs(5),
        delete: Duration::from_secs(5),
        initial_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
    };
    Provider::with_timeouts(client, timeouts)
}

fn subscription_config(modules: &[&str], quantity: i64) -> SubscriptionConfig {
    SubscriptionConfig {
        name: "prod".to_string(),
        payment_method: PaymentMethod::CreditCard,
        payment_method_id: Some(9),
        memory_storage: MemoryStorage::Ram,
        cloud_provider: CloudProviderConfig {
            provider: CloudProvider::Aws,
            cloud_account_id: None,
            regions: vec![RegionConfig {
                region: "us-east-1".to_string(),
                deployment_cidr: "10.0.0.0/24".to_string(),
                multiple_availability_zones: false,
                preferred_availability_zones: Vec::new(),
            }],
        },
        creation_plan: Some(CreationPlan {
            memory_limit_in_gb: Some(1.0),
            dataset_size_in_gb: None,
            average_item_size_in_bytes: None,
            replication: false,
            support_oss_cluster_api: false,
            throughput: Throughput {
                by: ThroughputBy::OperationsPerSecond,
                value: 10_000,
            },
            quantity,
            modules: modules.iter().map(|m| m.to_string()).collect(),
        }),
        allowlist: None,
        maintenance_windows: None,
        active_active: false,
    }
}

async fn mock_completed_task(server: &MockServer, task_id: &str, resource_id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": task_id,
            "status": "processing-completed",
            "response": {"resourceId": resource_id}
        })))
        .mount(server)
        .await;
}

async fn sent_body(server: &MockServer, http_method: &str, url_path: &str) -> Value {
    let request = server
        .received_requests()
        .await
        .expect("requests recorded")
        .into_iter()
        .find(|r| r.method.to_string() == http_method && r.url.path() == url_path)
        .unwrap_or_else(|| panic!("no {http_method} {url_path} request was made"));
    serde_json::from_slice(&request.body).expect("request body is JSON")
}

#[tokio::test]
async fn subscription_create_expands_plan_onto_the_wire() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-sub-create",
            "status": "received"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_completed_task(&server, "task-sub-create", 1234).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1234,
            "name": "prod",
            "status": "active",
            "paymentMethodType": "credit-card",
            "memoryStorage": "ram",
            "numberOfDatabases": 1
        })))
        .mount(&server)
        .await;

    let resource = SubscriptionResource::new(test_provider(&server));
    let state = resource
        .create(&subscription_config(&["RedisJSON", "RedisBloom"], 1))
        .await?;

    assert_eq!(state.id, SubscriptionId(1234));
    assert_eq!(state.status, "active");

    let body = sent_body(&server, "POST", "/subscriptions").await;
    let databases = body["databases"].as_array().unwrap();
    assert_eq!(databases.len(), 1);
    assert_eq!(
        databases[0]["modules"],
        json!([{"name": "RedisJSON"}, {"name": "RedisBloom"}])
    );
    // Neither module family has a conversion rule: the unit is untouched.
    assert_eq!(
        databases[0]["throughputMeasurement"],
        json!({"by": "operations-per-second", "value": 10000})
    );
    assert_eq!(databases[0]["quantity"], 1);
    Ok(())
}

#[tokio::test]
async fn subscription_create_isolates_redisgraph() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-sub-create",
            "status": "received"
        })))
        .mount(&server)
        .await;
    mock_completed_task(&server, "task-sub-create", 1234).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1234, "name": "prod", "status": "active"
        })))
        .mount(&server)
        .await;

    let mut config = subscription_config(&["RedisJSON", "RedisGraph", "RedisBloom"], 5);
    config.creation_plan.as_mut().unwrap().replication = true;

    SubscriptionResource::new(test_provider(&server))
        .create(&config)
        .await?;

    let body = sent_body(&server, "POST", "/subscriptions").await;
    let databases = body["databases"].as_array().unwrap();
    assert_eq!(databases.len(), 2);
    assert_eq!(databases[0]["modules"], json!([{"name": "RedisGraph"}]));
    assert_eq!(databases[0]["quantity"], 1);
    assert_eq!(
        databases[0]["throughputMeasurement"],
        json!({"by": "operations-per-second", "value": 10000})
    );
    assert_eq!(
        databases[1]["modules"],
        json!([{"name": "RedisJSON"}, {"name": "RedisBloom"}])
    );
    assert_eq!(databases[1]["quantity"], 4);
    assert_eq!(
        databases[1]["throughputMeasurement"],
        json!({"by": "operations-per-second", "value": 10000})
    );
    Ok(())
}

#[tokio::test]
async fn database_create_generates_password() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "name": "prod", "status": "active"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/1/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-db-create",
            "status": "received"
        })))
        .mount(&server)
        .await;
    mock_completed_task(&server, "task-db-create", 51).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/51"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databaseId": 51,
            "name": "cache",
            "status": "active",
            "publicEndpoint": "redis-51.example.com:16379",
            "security": {"enableDefaultUser": true}
        })))
        .mount(&server)
        .await;

    let config = DatabaseConfig {
        name: "cache".to_string(),
        protocol: Protocol::Redis,
        memory_limit_in_gb: Some(1.0),
        dataset_size_in_gb: None,
        data_persistence: None,
        data_eviction: None,
        replication: false,
        throughput: None,
        average_item_size_in_bytes: None,
        modules: Vec::new(),
        alerts: Vec::new(),
        password: None,
        enable_tls: false,
        client_ssl_certificate: None,
        client_tls_certificates: Vec::new(),
        resp_version: None,
        port: None,
        backup: None,
        enable_default_user: true,
        source_ips: Vec::new(),
        replica_of: Vec::new(),
    };
    let state = DatabaseResource::new(test_provider(&server))
        .create(SubscriptionId(1), &config)
        .await?;

    let password = state.password.expect("password generated");
    assert_eq!(password.len(), 32);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let body = sent_body(&server, "POST", "/subscriptions/1/databases").await;
    assert_eq!(body["password"].as_str().unwrap(), password);
    assert_eq!(state.public_endpoint.as_deref(), Some("redis-51.example.com:16379"));
    Ok(())
}

fn aa_config() -> ActiveActiveDatabaseConfig {
    ActiveActiveDatabaseConfig {
        name: "geo".to_string(),
        memory_limit_in_gb: Some(1.0),
        dataset_size_in_gb: None,
        global: GlobalSettings {
            data_persistence: Some("none".to_string()),
            password: None,
            source_ips: Vec::new(),
            alerts: Vec::new(),
            enable_default_user: true,
            enable_tls: false,
        },
        override_regions: Vec::new(),
        modules: Vec::new(),
        client_ssl_certificate: None,
        client_tls_certificates: Vec::new(),
        port: None,
    }
}

fn aa_database_body(east1_default_user: bool) -> Value {
    json!({
        "databaseId": 60,
        "name": "geo",
        "status": "active",
        "dataPersistence": "none",
        "security": {"enableDefaultUser": true},
        "crdbDatabases": [
            {
                "region": "us-east-1",
                "dataPersistence": "none",
                "enableDefaultUser": east1_default_user,
                "publicEndpoint": "redis-60.us-east-1.example.com:16379"
            },
            {
                "region": "us-east-2",
                "dataPersistence": "none",
                "enableDefaultUser": true,
                "publicEndpoint": "redis-60.us-east-2.example.com:16379"
            }
        ]
    })
}

#[tokio::test]
async fn active_active_create_suppresses_echoed_overrides() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "name": "prod", "status": "active"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/1/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-aa-create",
            "status": "received"
        })))
        .mount(&server)
        .await;
    mock_completed_task(&server, "task-aa-create", 60).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/60"))
        .respond_with(ResponseTemplate::new(200).set_body_json(aa_database_body(true)))
        .mount(&server)
        .await;

    let state = ActiveActiveDatabaseResource::new(test_provider(&server))
        .create(SubscriptionId(1), &aa_config())
        .await
        .unwrap();

    let body = sent_body(&server, "POST", "/subscriptions/1/databases").await;
    assert_eq!(body["globalEnableDefaultUser"], true);

    // Both regions echo the global: no override synthesized for either.
    assert_eq!(state.override_regions.len(), 2);
    assert!(state.override_regions.iter().all(RegionOverride::is_empty));
    assert_eq!(state.regions[0].region, "us-east-1");
    assert!(state.global.enable_default_user);
}

#[tokio::test]
async fn active_active_update_writes_single_region_override() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "name": "prod", "status": "active"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/1/databases/60"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-aa-update",
            "status": "received"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_completed_task(&server, "task-aa-update", 60).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/60"))
        .respond_with(ResponseTemplate::new(200).set_body_json(aa_database_body(false)))
        .mount(&server)
        .await;

    let prior = aa_config();
    let mut config = aa_config();
    config.override_regions = vec![RegionOverride {
        region: "us-east-1".to_string(),
        enable_default_user: Some(false),
        ..Default::default()
    }];

    let state = ActiveActiveDatabaseResource::new(test_provider(&server))
        .update(
            rediscloud_provider::DatabaseId {
                subscription: 1,
                database: 60,
            },
            &prior,
            &config,
        )
        .await
        .unwrap();

    // The globals did not change, so the only PUT is the region write.
    let body = sent_body(&server, "PUT", "/subscriptions/1/databases/60").await;
    assert!(body.get("globalEnableDefaultUser").is_none());
    assert_eq!(
        body["regions"],
        json!([{"region": "us-east-1", "enableDefaultUser": false}])
    );

    assert_eq!(state.override_regions[0].region, "us-east-1");
    assert_eq!(state.override_regions[0].enable_default_user, Some(false));
    assert!(state.override_regions[1].is_empty());
}

#[tokio::test]
async fn subscription_delete_refuses_with_databases_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [{"databaseId": 51, "name": "cache"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = SubscriptionResource::new(test_provider(&server))
        .delete(SubscriptionId(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cache"));
}

#[tokio::test]
async fn read_maps_not_found_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "subscription not found"})),
        )
        .mount(&server)
        .await;

    let state = SubscriptionResource::new(test_provider(&server))
        .read(SubscriptionId(404))
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn conflict_surfaces_api_message() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/1/databases/51"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "SUBSCRIPTION_NOT_ACTIVE"})),
        )
        .mount(&server)
        .await;

    let err = DatabaseResource::new(test_provider(&server))
        .delete(rediscloud_provider::DatabaseId {
            subscription: 1,
            database: 51,
        })
        .await
        .unwrap_err();
    assert_eq!(err.class(), rediscloud_provider::ErrorClass::Conflict);
    assert!(err.to_string().contains("SUBSCRIPTION_NOT_ACTIVE"));
}

#[tokio::test]
async fn failed_task_surfaces_description() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "name": "prod", "status": "active"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/1/databases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-fail",
            "status": "received"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/task-fail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-fail",
            "status": "processing-error",
            "response": {"error": {
                "type": "DATABASE_LIMIT_EXCEEDED",
                "description": "Subscription database limit reached"
            }}
        })))
        .mount(&server)
        .await;

    let config = DatabaseConfig {
        name: "cache".to_string(),
        protocol: Protocol::Redis,
        memory_limit_in_gb: Some(1.0),
        dataset_size_in_gb: None,
        data_persistence: None,
        data_eviction: None,
        replication: false,
        throughput: None,
        average_item_size_in_bytes: None,
        modules: Vec::new(),
        alerts: Vec::new(),
        password: Some("hunter2hunter2hunter2hunter2hunt".to_string()),
        enable_tls: false,
        client_ssl_certificate: None,
        client_tls_certificates: Vec::new(),
        resp_version: None,
        port: None,
        backup: None,
        enable_default_user: true,
        source_ips: Vec::new(),
        replica_of: Vec::new(),
    };
    let err = DatabaseResource::new(test_provider(&server))
        .create(SubscriptionId(1), &config)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Subscription database limit reached"));
}

#[tokio::test]
async fn mutations_serialize_per_subscription() {
    // Two concurrent deletes against one subscription must not overlap:
    // with the 409-on-concurrency service this lock is what prevents
    // error-driven retry storms.
    let server = MockServer::start().await;
    let provider = test_provider(&server);

    let lock_a = provider.lock_subscription(7);
    let guard = lock_a.await;
    let provider_clone = Arc::clone(&provider);
    let contender = tokio::spawn(async move {
        let _guard = provider_clone.lock_subscription(7).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());
    drop(guard);
    tokio::time::timeout(Duration::from_secs(1), contender)
        .await
        .expect("contender acquires after release")
        .unwrap();

    // Distinct subscriptions proceed concurrently.
    let (first, second) = futures::join!(
        provider.lock_subscription(1),
        provider.lock_subscription(2)
    );
    drop(first);
    drop(second);
}
