//! VPC peering endpoints

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// Peering lifecycle states
pub const PEERING_STATUS_INITIATING: &str = "initiating-request";
pub const PEERING_STATUS_PENDING_ACCEPTANCE: &str = "pending-acceptance";
pub const PEERING_STATUS_ACTIVE: &str = "active";
pub const PEERING_STATUS_INACTIVE: &str = "inactive";
pub const PEERING_STATUS_FAILED: &str = "failed";

/// Request body for `POST /subscriptions/{id}/peerings`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VpcPeeringCreateRequest {
    /// "AWS" or "GCP"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vpc_cidrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_project_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_network_name: Option<String>,
}

/// A peering as reported by the API
///
/// The service reports a single-CIDR peering in `vpc_cidr` and leaves
/// `vpc_cidrs` empty, regardless of which form the create request used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VpcPeering {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_peering_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_peering_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vpc_cidrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_project_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_project_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_peering_id: Option<String>,
}

#[derive(Deserialize)]
struct PeeringList {
    #[serde(default)]
    peerings: Vec<VpcPeering>,
}

/// Handler for the `/subscriptions/{id}/peerings` endpoints
pub struct VpcPeeringHandler {
    client: CloudClient,
}

impl VpcPeeringHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Create a peering; answers with a task
    pub async fn create(
        &self,
        subscription_id: i64,
        request: &VpcPeeringCreateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(&format!("/subscriptions/{subscription_id}/peerings"), request)
            .await
    }

    /// List the subscription's peerings
    pub async fn list(&self, subscription_id: i64) -> Result<Vec<VpcPeering>> {
        let list: PeeringList = self
            .client
            .get(&format!("/subscriptions/{subscription_id}/peerings"))
            .await?;
        Ok(list.peerings)
    }

    /// Delete a peering; answers with a task
    pub async fn delete(&self, subscription_id: i64, peering_id: i64) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!(
                "/subscriptions/{subscription_id}/peerings/{peering_id}"
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cidr_read_shape() {
        let peering: VpcPeering = serde_json::from_str(
            r#"{"vpcPeeringId": 7, "status": "active", "awsAccountId": "123456789012",
                "vpcId": "vpc-0f1e2d3c", "vpcCidr": "10.0.0.0/24"}"#,
        )
        .unwrap();
        assert_eq!(peering.vpc_cidr.as_deref(), Some("10.0.0.0/24"));
        assert!(peering.vpc_cidrs.is_empty());
    }
}
