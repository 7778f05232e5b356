//! GCP Private Service Connect endpoints
//!
//! Standard subscriptions carry one PSC service; Active-Active subscriptions
//! carry one per region, addressed through the `/regions/{regionId}` prefix.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// PSC service lifecycle states
pub const PSC_STATUS_CREATE_QUEUED: &str = "create-queued";
pub const PSC_STATUS_INITIALIZED: &str = "initialized";
pub const PSC_STATUS_CREATE_PENDING: &str = "create-pending";
pub const PSC_STATUS_ACTIVE: &str = "active";

/// A PSC service as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PscService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_attachment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A PSC endpoint attached to a service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PscEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_vpc_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_vpc_subnet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_connection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Request body for creating or updating a PSC endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PscEndpointRequest {
    pub gcp_project_id: String,
    pub gcp_vpc_name: String,
    pub gcp_vpc_subnet_name: String,
    pub endpoint_connection_name: String,
}

#[derive(Deserialize)]
struct EndpointList {
    #[serde(default)]
    endpoints: Vec<PscEndpoint>,
}

/// Handler for the Private Service Connect endpoints
pub struct PscHandler {
    client: CloudClient,
}

impl PscHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    fn base(subscription_id: i64, region_id: Option<i64>) -> String {
        match region_id {
            Some(region_id) => format!(
                "/subscriptions/{subscription_id}/regions/{region_id}/private-service-connect"
            ),
            None => format!("/subscriptions/{subscription_id}/private-service-connect"),
        }
    }

    /// Create the subscription's PSC service; answers with a task
    pub async fn create_service(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(&Self::base(subscription_id, region_id), &serde_json::json!({}))
            .await
    }

    /// Fetch the subscription's PSC service
    pub async fn get_service(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
    ) -> Result<PscService> {
        self.client.get(&Self::base(subscription_id, region_id)).await
    }

    /// Delete the PSC service; answers with a task
    pub async fn delete_service(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
    ) -> Result<TaskStateUpdate> {
        self.client.delete(&Self::base(subscription_id, region_id)).await
    }

    /// Create an endpoint on the PSC service; answers with a task
    pub async fn create_endpoint(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
        request: &PscEndpointRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(
                &format!("{}/endpoints", Self::base(subscription_id, region_id)),
                request,
            )
            .await
    }

    /// List the endpoints attached to the PSC service
    pub async fn list_endpoints(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
    ) -> Result<Vec<PscEndpoint>> {
        let list: EndpointList = self
            .client
            .get(&format!("{}/endpoints", Self::base(subscription_id, region_id)))
            .await?;
        Ok(list.endpoints)
    }

    /// Delete an endpoint; answers with a task
    pub async fn delete_endpoint(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
        endpoint_id: i64,
    ) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!(
                "{}/endpoints/{endpoint_id}",
                Self::base(subscription_id, region_id)
            ))
            .await
    }

    /// Fetch the GCP-side creation script for an endpoint
    pub async fn get_endpoint_creation_script(
        &self,
        subscription_id: i64,
        region_id: Option<i64>,
        endpoint_id: i64,
    ) -> Result<serde_json::Value> {
        self.client
            .get(&format!(
                "{}/endpoints/{endpoint_id}/creationScripts",
                Self::base(subscription_id, region_id)
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_scoped_path() {
        assert_eq!(
            PscHandler::base(12, Some(3)),
            "/subscriptions/12/regions/3/private-service-connect"
        );
        assert_eq!(
            PscHandler::base(12, None),
            "/subscriptions/12/private-service-connect"
        );
    }
}
