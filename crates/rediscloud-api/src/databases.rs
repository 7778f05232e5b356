//! Database endpoints, including Active-Active (geo-replicated) variants
//!
//! The same REST paths serve both deployment flavors; the request body
//! decides which shape the service interprets, so the flavors get their own
//! request types here.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::subscriptions::{ModuleSpec, ThroughputMeasurement};
use crate::tasks::TaskStateUpdate;

/// Database lifecycle states
pub const DATABASE_STATUS_ACTIVE: &str = "active";
pub const DATABASE_STATUS_PENDING: &str = "pending";
pub const DATABASE_STATUS_CHANGE_PENDING: &str = "active-change-pending";
pub const DATABASE_STATUS_ERROR: &str = "error";

/// An alert configured on a database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAlert {
    pub name: String,
    pub value: i64,
}

/// A module enabled on a database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseModule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Periodic backup configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBackup {
    /// One of "every-1-hours", "every-6-hours", "every-12-hours", "every-24-hours"
    pub interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

/// Security block returned on reads
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSecurity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_authentication: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls_client_authentication: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
}

/// Per-region properties of an Active-Active database
///
/// Reads report every field populated with the effective value; writes send
/// only the fields being overridden for that region.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalRegionProperties {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<DatabaseAlert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_operations_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_operations_per_second: Option<i64>,
}

/// A database as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replica_of: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<DatabaseModule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<DatabaseAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<DatabaseSecurity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<RemoteBackup>,
    /// Populated only for Active-Active databases
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crdb_databases: Vec<LocalRegionProperties>,
}

/// Request body for `POST /subscriptions/{id}/databases`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replica_of: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_backup: Option<RemoteBackup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_tls_certificates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<DatabaseAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
}

/// Request body for `PUT /subscriptions/{id}/databases/{dbId}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_backup: Option<RemoteBackup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_certificates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
}

/// Request body for creating an Active-Active database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveActiveDatabaseCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_source_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_alerts: Vec<DatabaseAlert>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_modules: Vec<ModuleSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_tls_certificates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_throughput_measurement: Vec<crate::subscriptions::LocalThroughputMeasurement>,
}

/// Request body for updating an Active-Active database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveActiveDatabaseUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_source_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_alerts: Option<Vec<DatabaseAlert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_certificates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<LocalRegionProperties>,
}

/// Request body for `POST .../databases/{dbId}/import`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseImportRequest {
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_from_uri: Vec<String>,
}

/// Request body for `POST .../databases/{dbId}/backup`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseBackupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

#[derive(Deserialize)]
struct DatabaseList {
    #[serde(default)]
    databases: Vec<Database>,
}

/// Handler for the `/subscriptions/{id}/databases` endpoints
pub struct DatabaseHandler {
    client: CloudClient,
}

impl DatabaseHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    fn path(subscription_id: i64) -> String {
        format!("/subscriptions/{subscription_id}/databases")
    }

    /// Create a database; answers with a task to poll
    pub async fn create(
        &self,
        subscription_id: i64,
        request: &DatabaseCreateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client.post(&Self::path(subscription_id), request).await
    }

    /// Create an Active-Active database; answers with a task
    pub async fn create_active_active(
        &self,
        subscription_id: i64,
        request: &ActiveActiveDatabaseCreateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client.post(&Self::path(subscription_id), request).await
    }

    /// Fetch a database by id
    pub async fn get(&self, subscription_id: i64, database_id: i64) -> Result<Database> {
        self.client
            .get(&format!("{}/{database_id}", Self::path(subscription_id)))
            .await
    }

    /// List the subscription's databases
    pub async fn list(&self, subscription_id: i64) -> Result<Vec<Database>> {
        let list: DatabaseList = self.client.get(&Self::path(subscription_id)).await?;
        Ok(list.databases)
    }

    /// Update a database; answers with a task
    pub async fn update(
        &self,
        subscription_id: i64,
        database_id: i64,
        request: &DatabaseUpdateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("{}/{database_id}", Self::path(subscription_id)), request)
            .await
    }

    /// Update an Active-Active database (global settings and region overrides)
    pub async fn update_active_active(
        &self,
        subscription_id: i64,
        database_id: i64,
        request: &ActiveActiveDatabaseUpdateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("{}/{database_id}", Self::path(subscription_id)), request)
            .await
    }

    /// Rotate the database password; answers with a task
    pub async fn update_password(
        &self,
        subscription_id: i64,
        database_id: i64,
        password: &str,
    ) -> Result<TaskStateUpdate> {
        let request = DatabaseUpdateRequest {
            password: Some(password.to_string()),
            ..Default::default()
        };
        self.update(subscription_id, database_id, &request).await
    }

    /// Delete a database; answers with a task
    pub async fn delete(&self, subscription_id: i64, database_id: i64) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!("{}/{database_id}", Self::path(subscription_id)))
            .await
    }

    /// Add an alert to a database; answers with a task
    pub async fn create_alert(
        &self,
        subscription_id: i64,
        database_id: i64,
        alert: &DatabaseAlert,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(
                &format!("{}/{database_id}/alerts", Self::path(subscription_id)),
                alert,
            )
            .await
    }

    /// Change an existing alert's threshold; answers with a task
    pub async fn update_alert(
        &self,
        subscription_id: i64,
        database_id: i64,
        alert: &DatabaseAlert,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(
                &format!(
                    "{}/{database_id}/alerts/{}",
                    Self::path(subscription_id),
                    alert.name
                ),
                alert,
            )
            .await
    }

    /// Remove an alert from a database; answers with a task
    pub async fn delete_alert(
        &self,
        subscription_id: i64,
        database_id: i64,
        alert_name: &str,
    ) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!(
                "{}/{database_id}/alerts/{alert_name}",
                Self::path(subscription_id)
            ))
            .await
    }

    /// Import a data set into the database; answers with a task
    pub async fn import(
        &self,
        subscription_id: i64,
        database_id: i64,
        request: &DatabaseImportRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(
                &format!("{}/{database_id}/import", Self::path(subscription_id)),
                request,
            )
            .await
    }

    /// Trigger an on-demand backup; answers with a task
    pub async fn backup(
        &self,
        subscription_id: i64,
        database_id: i64,
        request: &DatabaseBackupRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(
                &format!("{}/{database_id}/backup", Self::path(subscription_id)),
                request,
            )
            .await
    }
}
