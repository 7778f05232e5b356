//! Transit Gateway attachment lifecycle
//!
//! The attachment object materializes on the Redis side only after the
//! shared-TGW invitation is accepted in AWS, so creation waits for the
//! attachment to *appear* in the subscription's list: an empty listing is a
//! pending state, not an error.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rediscloud_api::TransitGatewayHandler;
use rediscloud_api::connectivity::transit_gateway::{
    TGW_ATTACHMENT_STATUS_ACTIVE, TGW_ATTACHMENT_STATUS_PENDING_ACCEPTANCE, TgwAttachment,
    TgwAttachmentUpdateRequest,
};
use tracing::{debug, info};

use crate::cidr::validate_cidr;
use crate::error::{ProviderError, Result};
use crate::ids::{SubscriptionId, TgwAttachmentId};
use crate::provider::Provider;
use crate::wait::{DEFAULT_ATTEMPT_TIMEOUT, StateChangeConf, wait_for_task};

/// Synthetic pending state while the attachment has not appeared
const STATE_MISSING: &str = "missing";

/// Desired state of a TGW attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwAttachmentConfig {
    /// UID of the shared transit gateway to attach to
    pub tgw_id: String,
    /// CIDRs routed over the attachment
    pub cidrs: Vec<String>,
}

/// Observed state of a TGW attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwAttachmentState {
    pub id: TgwAttachmentId,
    pub aws_tgw_uid: Option<String>,
    pub attachment_uid: Option<String>,
    pub status: String,
    pub attachment_status: Option<String>,
    pub aws_account_id: Option<String>,
    pub cidrs: Vec<String>,
}

/// Lifecycle for TGW attachments
pub struct TgwAttachmentResource {
    provider: Arc<Provider>,
}

impl TgwAttachmentResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> TransitGatewayHandler {
        TransitGatewayHandler::new(self.provider.client().clone())
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &TgwAttachmentConfig) -> Result<()> {
        if config.tgw_id.is_empty() {
            return Err(ProviderError::Invalid("tgw_id is required".to_string()));
        }
        for cidr in &config.cidrs {
            validate_cidr("cidrs", cidr)?;
        }
        Ok(())
    }

    /// Request the attachment and wait for it to appear on the Redis side
    pub async fn create(
        &self,
        subscription: SubscriptionId,
        config: &TgwAttachmentConfig,
    ) -> Result<TgwAttachmentState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(subscription.0).await;
        let timeouts = self.provider.timeouts().clone();

        info!(%subscription, tgw = %config.tgw_id, "requesting TGW attachment");
        let task = self
            .handler()
            .create_attachment(subscription.0, &config.tgw_id)
            .await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.peering,
                timeouts.poll_interval,
            )
            .await?;
        }

        let attachment = self
            .wait_for_appearance(subscription, &config.tgw_id, timeouts.peering)
            .await?;
        let id = TgwAttachmentId {
            subscription: subscription.0,
            attachment: attachment.id.ok_or_else(|| {
                ProviderError::Internal("attachment appeared without an id".to_string())
            })?,
        };

        if !config.cidrs.is_empty() {
            debug!(%id, "applying attachment CIDRs");
            let request = TgwAttachmentUpdateRequest {
                cidrs: config.cidrs.clone(),
            };
            let task = self
                .handler()
                .update_attachment(id.subscription, id.attachment, &request)
                .await?;
            if let Some(task_id) = task.task_id {
                wait_for_task(
                    self.provider.client(),
                    &task_id,
                    timeouts.peering,
                    timeouts.poll_interval,
                )
                .await?;
            }
        }

        self.read(id).await?.ok_or_else(|| {
            ProviderError::Internal(format!("TGW attachment {id} vanished after create"))
        })
    }

    /// Wait until the attachment for `tgw_id` shows up in the listing.
    ///
    /// Not-found is pending here: the Redis side creates the object
    /// asynchronously once the AWS invitation is accepted, so the wait times
    /// out rather than erroring when the user has not accepted yet.
    async fn wait_for_appearance(
        &self,
        subscription: SubscriptionId,
        tgw_id: &str,
        timeout: Duration,
    ) -> Result<TgwAttachment> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "TGW attachment",
            id: format!("{subscription}/{tgw_id}"),
            pending: vec![STATE_MISSING],
            target: vec![
                TGW_ATTACHMENT_STATUS_ACTIVE,
                TGW_ATTACHMENT_STATUS_PENDING_ACCEPTANCE,
            ],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                let attachments = handler.list_attachments(subscription.0).await?;
                match attachments
                    .into_iter()
                    .find(|a| a.aws_tgw_uid.as_deref() == Some(tgw_id))
                {
                    Some(attachment) => {
                        let status = attachment.status.clone().unwrap_or_default();
                        Ok((attachment, status))
                    }
                    None => Ok((TgwAttachment::default(), STATE_MISSING.to_string())),
                }
            }
        })
        .await
    }

    /// Read the attachment; `None` means it no longer exists
    pub async fn read(&self, id: TgwAttachmentId) -> Result<Option<TgwAttachmentState>> {
        let attachments = match self.handler().list_attachments(id.subscription).await {
            Ok(attachments) => attachments,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(attachments
            .into_iter()
            .find(|a| a.id == Some(id.attachment))
            .map(|attachment| flatten(id, attachment)))
    }

    /// Replace the attachment's routed CIDRs
    pub async fn update(
        &self,
        id: TgwAttachmentId,
        config: &TgwAttachmentConfig,
    ) -> Result<TgwAttachmentState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(id.subscription).await;
        let timeouts = self.provider.timeouts().clone();

        info!(%id, "updating TGW attachment CIDRs");
        let request = TgwAttachmentUpdateRequest {
            cidrs: config.cidrs.clone(),
        };
        let task = self
            .handler()
            .update_attachment(id.subscription, id.attachment, &request)
            .await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.peering,
                timeouts.poll_interval,
            )
            .await?;
        }

        self.read(id).await?.ok_or_else(|| {
            ProviderError::Internal(format!("TGW attachment {id} vanished during update"))
        })
    }

    /// Delete the attachment
    pub async fn delete(&self, id: TgwAttachmentId) -> Result<()> {
        let _guard = self.provider.lock_subscription(id.subscription).await;
        let timeouts = self.provider.timeouts().clone();
        info!(%id, "deleting TGW attachment");
        let task = match self
            .handler()
            .delete_attachment(id.subscription, id.attachment)
            .await
        {
            Ok(task) => task,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.delete,
                timeouts.poll_interval,
            )
            .await?;
        }
        Ok(())
    }
}

fn flatten(id: TgwAttachmentId, attachment: TgwAttachment) -> TgwAttachmentState {
    TgwAttachmentState {
        id,
        aws_tgw_uid: attachment.aws_tgw_uid,
        attachment_uid: attachment.attachment_uid,
        status: attachment.status.unwrap_or_default(),
        attachment_status: attachment.attachment_status,
        aws_account_id: attachment.aws_account_id,
        cidrs: attachment.cidrs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_tgw_id() {
        let config = TgwAttachmentConfig {
            tgw_id: String::new(),
            cidrs: Vec::new(),
        };
        assert!(TgwAttachmentResource::validate(&config).is_err());
    }

    #[test]
    fn test_validate_checks_cidrs() {
        let config = TgwAttachmentConfig {
            tgw_id: "tgw-0a1b2c3d".to_string(),
            cidrs: vec!["10.4.0.0/16".to_string(), "bogus".to_string()],
        };
        assert!(TgwAttachmentResource::validate(&config).is_err());
    }

    #[test]
    fn test_flatten_carries_attachment_fields() {
        let id = TgwAttachmentId {
            subscription: 12,
            attachment: 40,
        };
        let state = flatten(
            id,
            TgwAttachment {
                id: Some(40),
                aws_tgw_uid: Some("tgw-0a1b2c3d".to_string()),
                status: Some("active".to_string()),
                cidrs: vec!["10.4.0.0/16".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(state.status, "active");
        assert_eq!(state.cidrs.len(), 1);
        assert_eq!(state.id.to_string(), "12/40");
    }
}
