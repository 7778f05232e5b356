//! Cloud-account credential endpoints
//!
//! A cloud account stores provider credentials that subscriptions deploy
//! into, as an alternative to Redis-managed infrastructure accounts.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// Cloud-account lifecycle states
pub const CLOUD_ACCOUNT_STATUS_ACTIVE: &str = "active";
pub const CLOUD_ACCOUNT_STATUS_DRAFT: &str = "draft";
pub const CLOUD_ACCOUNT_STATUS_PENDING: &str = "pending";
pub const CLOUD_ACCOUNT_STATUS_ERROR: &str = "error";

/// A cloud account as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
}

/// Request body for creating or updating a cloud account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_login_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudAccountList {
    #[serde(default)]
    cloud_accounts: Vec<CloudAccount>,
}

/// Handler for the `/cloud-accounts` endpoints
pub struct CloudAccountHandler {
    client: CloudClient,
}

impl CloudAccountHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Register provider credentials; answers with a task
    pub async fn create(&self, request: &CloudAccountRequest) -> Result<TaskStateUpdate> {
        self.client.post("/cloud-accounts", request).await
    }

    /// Fetch a cloud account by id
    pub async fn get(&self, cloud_account_id: i64) -> Result<CloudAccount> {
        self.client
            .get(&format!("/cloud-accounts/{cloud_account_id}"))
            .await
    }

    /// List the account's cloud accounts
    pub async fn list(&self) -> Result<Vec<CloudAccount>> {
        let list: CloudAccountList = self.client.get("/cloud-accounts").await?;
        Ok(list.cloud_accounts)
    }

    /// Update stored credentials; answers with a task
    pub async fn update(
        &self,
        cloud_account_id: i64,
        request: &CloudAccountRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("/cloud-accounts/{cloud_account_id}"), request)
            .await
    }

    /// Delete a cloud account; answers with a task
    pub async fn delete(&self, cloud_account_id: i64) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!("/cloud-accounts/{cloud_account_id}"))
            .await
    }
}
