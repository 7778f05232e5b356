//! Subscription endpoints
//!
//! Mutations answer with a [`TaskStateUpdate`](crate::tasks::TaskStateUpdate)
//! to be polled; reads answer with the resource directly.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// Subscription lifecycle states
pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";
pub const SUBSCRIPTION_STATUS_PENDING: &str = "pending";
pub const SUBSCRIPTION_STATUS_DELETING: &str = "deleting";
pub const SUBSCRIPTION_STATUS_ERROR: &str = "error";

/// Networking block of a region
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegionNetworking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

/// A region inside a cloud-provider block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRegion {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_availability_zones: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_availability_zones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking: Option<RegionNetworking>,
}

/// Cloud-provider block of a subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProviderSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<SubscriptionRegion>,
}

/// Throughput declaration for a database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputMeasurement {
    pub by: String,
    pub value: i64,
}

/// Throughput measurement units
pub const THROUGHPUT_BY_OPS: &str = "operations-per-second";
pub const THROUGHPUT_BY_SHARDS: &str = "number-of-shards";

/// Region-scoped throughput for Active-Active sizing databases
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalThroughputMeasurement {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_operations_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_operations_per_second: Option<i64>,
}

/// Module declaration on a sizing database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub name: String,
}

/// A sizing database declared at subscription-create time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizingDatabaseSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_throughput_measurement: Vec<LocalThroughputMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,
}

/// Request body for `POST /subscriptions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_storage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cloud_providers: Vec<CloudProviderSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<SizingDatabaseSpec>,
}

/// Request body for `PUT /subscriptions/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
}

/// A subscription as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_databases: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cloud_details: Vec<CloudProviderSpec>,
}

/// CIDR allowlist attached to a subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CidrAllowlist {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidr_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
}

/// A single maintenance window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    pub start_hour: i64,
    pub duration_in_hours: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,
}

/// Maintenance-window configuration of a subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindows {
    /// "automatic" or "manual"
    pub mode: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<MaintenanceWindow>,
}

/// One line of the subscription's pricing breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingEntry {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

#[derive(Deserialize)]
struct PricingList {
    #[serde(default)]
    pricing: Vec<PricingEntry>,
}

/// Handler for the `/subscriptions` endpoints
pub struct SubscriptionHandler {
    client: CloudClient,
}

impl SubscriptionHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Create a subscription; answers with a task to poll
    pub async fn create(&self, request: &SubscriptionCreateRequest) -> Result<TaskStateUpdate> {
        self.client.post("/subscriptions", request).await
    }

    /// Fetch a subscription by id
    pub async fn get(&self, subscription_id: i64) -> Result<Subscription> {
        self.client.get(&format!("/subscriptions/{subscription_id}")).await
    }

    /// List all subscriptions on the account
    pub async fn list(&self) -> Result<Vec<Subscription>> {
        let list: SubscriptionList = self.client.get("/subscriptions").await?;
        Ok(list.subscriptions)
    }

    /// Update mutable subscription attributes; answers with a task
    pub async fn update(
        &self,
        subscription_id: i64,
        request: &SubscriptionUpdateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("/subscriptions/{subscription_id}"), request)
            .await
    }

    /// Delete a subscription; answers with a task
    pub async fn delete(&self, subscription_id: i64) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!("/subscriptions/{subscription_id}"))
            .await
    }

    /// Fetch the subscription's CIDR allowlist
    pub async fn get_cidr_allowlist(&self, subscription_id: i64) -> Result<CidrAllowlist> {
        self.client
            .get(&format!("/subscriptions/{subscription_id}/cidr"))
            .await
    }

    /// Replace the subscription's CIDR allowlist; answers with a task
    pub async fn update_cidr_allowlist(
        &self,
        subscription_id: i64,
        allowlist: &CidrAllowlist,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("/subscriptions/{subscription_id}/cidr"), allowlist)
            .await
    }

    /// Fetch the subscription's maintenance windows
    pub async fn get_maintenance_windows(&self, subscription_id: i64) -> Result<MaintenanceWindows> {
        self.client
            .get(&format!("/subscriptions/{subscription_id}/maintenance-windows"))
            .await
    }

    /// Replace the subscription's maintenance windows; answers with a task
    pub async fn update_maintenance_windows(
        &self,
        subscription_id: i64,
        windows: &MaintenanceWindows,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(
                &format!("/subscriptions/{subscription_id}/maintenance-windows"),
                windows,
            )
            .await
    }

    /// Fetch the subscription's pricing breakdown
    pub async fn get_pricing(&self, subscription_id: i64) -> Result<Vec<PricingEntry>> {
        let list: PricingList = self
            .client
            .get(&format!("/subscriptions/{subscription_id}/pricing"))
            .await?;
        Ok(list.pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_serializes_camel_case() {
        let request = SubscriptionCreateRequest {
            name: "prod".to_string(),
            payment_method: Some("credit-card".to_string()),
            payment_method_id: Some(9),
            memory_storage: Some("ram".to_string()),
            databases: vec![SizingDatabaseSpec {
                name: "sizing-db-1".to_string(),
                memory_limit_in_gb: Some(1.0),
                quantity: Some(1),
                throughput_measurement: Some(ThroughputMeasurement {
                    by: THROUGHPUT_BY_OPS.to_string(),
                    value: 10_000,
                }),
                modules: vec![ModuleSpec {
                    name: "RedisJSON".to_string(),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["paymentMethodId"], 9);
        assert_eq!(value["databases"][0]["memoryLimitInGb"], 1.0);
        assert_eq!(
            value["databases"][0]["throughputMeasurement"]["by"],
            "operations-per-second"
        );
        // Unset optionals stay off the wire entirely.
        assert!(value.get("deploymentType").is_none());
    }

    #[test]
    fn test_subscription_deserializes() {
        let sub: Subscription = serde_json::from_str(
            r#"{"id": 1234, "name": "prod", "status": "active",
                "paymentMethodType": "credit-card", "memoryStorage": "ram",
                "numberOfDatabases": 2}"#,
        )
        .unwrap();
        assert_eq!(sub.id, Some(1234));
        assert_eq!(sub.status.as_deref(), Some(SUBSCRIPTION_STATUS_ACTIVE));
        assert_eq!(sub.number_of_databases, Some(2));
    }
}
