//! AWS Transit Gateway attachment endpoints
//!
//! Attachments appear on the Redis side asynchronously after the shared TGW
//! invitation is accepted in AWS, so callers list rather than get by id.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// Attachment lifecycle states
pub const TGW_ATTACHMENT_STATUS_ACTIVE: &str = "active";
pub const TGW_ATTACHMENT_STATUS_PENDING_ACCEPTANCE: &str = "pending-acceptance";

/// A TGW attachment as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TgwAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_tgw_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidrs: Vec<String>,
}

/// Request body for updating an attachment's CIDRs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TgwAttachmentUpdateRequest {
    pub cidrs: Vec<String>,
}

#[derive(Deserialize)]
struct AttachmentList {
    #[serde(default)]
    attachments: Vec<TgwAttachment>,
}

/// Handler for the `/subscriptions/{id}/transitGateways` endpoints
pub struct TransitGatewayHandler {
    client: CloudClient,
}

impl TransitGatewayHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// List the subscription's TGW attachments
    pub async fn list_attachments(&self, subscription_id: i64) -> Result<Vec<TgwAttachment>> {
        let list: AttachmentList = self
            .client
            .get(&format!(
                "/subscriptions/{subscription_id}/transitGateways/attachments"
            ))
            .await?;
        Ok(list.attachments)
    }

    /// Request an attachment to the given shared transit gateway; answers with a task
    pub async fn create_attachment(
        &self,
        subscription_id: i64,
        tgw_id: &str,
    ) -> Result<TaskStateUpdate> {
        self.client
            .post(
                &format!("/subscriptions/{subscription_id}/transitGateways/{tgw_id}/attachment"),
                &serde_json::json!({}),
            )
            .await
    }

    /// Replace an attachment's routed CIDRs; answers with a task
    pub async fn update_attachment(
        &self,
        subscription_id: i64,
        attachment_id: i64,
        request: &TgwAttachmentUpdateRequest,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(
                &format!(
                    "/subscriptions/{subscription_id}/transitGateways/attachments/{attachment_id}"
                ),
                request,
            )
            .await
    }

    /// Delete an attachment; answers with a task
    pub async fn delete_attachment(
        &self,
        subscription_id: i64,
        attachment_id: i64,
    ) -> Result<TaskStateUpdate> {
        self.client
            .delete(&format!(
                "/subscriptions/{subscription_id}/transitGateways/attachments/{attachment_id}"
            ))
            .await
    }

    /// Accept a shared-TGW invitation
    pub async fn accept_invitation(
        &self,
        subscription_id: i64,
        invitation_id: &str,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(
                &format!(
                    "/subscriptions/{subscription_id}/transitGateways/invitations/{invitation_id}/accept"
                ),
                &serde_json::json!({}),
            )
            .await
    }

    /// Reject a shared-TGW invitation
    pub async fn reject_invitation(
        &self,
        subscription_id: i64,
        invitation_id: &str,
    ) -> Result<TaskStateUpdate> {
        self.client
            .put(
                &format!(
                    "/subscriptions/{subscription_id}/transitGateways/invitations/{invitation_id}/reject"
                ),
                &serde_json::json!({}),
            )
            .await
    }
}
