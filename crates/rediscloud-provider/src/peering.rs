//! VPC peering lifecycle
//!
//! AWS peerings accept exactly one of a single `vpc_cidr` or a `vpc_cidrs`
//! list; the service reports a one-element list back through `vpc_cidr`
//! only, so reads normalize by populating both forms.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rediscloud_api::VpcPeeringHandler;
use rediscloud_api::connectivity::peering::{
    PEERING_STATUS_ACTIVE, PEERING_STATUS_INACTIVE, PEERING_STATUS_INITIATING,
    PEERING_STATUS_PENDING_ACCEPTANCE, VpcPeering, VpcPeeringCreateRequest,
};
use tracing::{debug, info};

use crate::cidr::validate_cidr;
use crate::error::{ProviderError, Result};
use crate::ids::{PeeringId, SubscriptionId};
use crate::provider::Provider;
use crate::wait::{DEFAULT_ATTEMPT_TIMEOUT, StateChangeConf, task_resource_id, wait_for_task};

/// Synthetic pending state while the created peering is not yet listed
const STATE_MISSING: &str = "missing";

/// AWS-side peering declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsPeeringConfig {
    pub source_region: Option<String>,
    pub destination_region: String,
    pub aws_account_id: String,
    pub vpc_id: String,
    /// Exactly one of `vpc_cidr` / `vpc_cidrs` must be supplied
    pub vpc_cidr: Option<String>,
    pub vpc_cidrs: Vec<String>,
}

/// GCP-side peering declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcpPeeringConfig {
    pub gcp_project_id: String,
    pub gcp_network_name: String,
    pub source_region: Option<String>,
}

/// Desired state of a peering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeeringConfig {
    Aws(AwsPeeringConfig),
    Gcp(GcpPeeringConfig),
}

/// Observed state of a peering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeeringState {
    pub id: PeeringId,
    pub status: String,
    pub aws_account_id: Option<String>,
    pub aws_peering_uid: Option<String>,
    pub vpc_id: Option<String>,
    /// Normalized: populated alongside `vpc_cidrs`
    pub vpc_cidr: Option<String>,
    /// Normalized: populated alongside `vpc_cidr`
    pub vpc_cidrs: Vec<String>,
    pub source_region: Option<String>,
    pub destination_region: Option<String>,
    pub gcp_project_id: Option<String>,
    pub gcp_network_name: Option<String>,
    pub gcp_redis_project_id: Option<String>,
    pub gcp_redis_network_name: Option<String>,
    pub cloud_peering_id: Option<String>,
}

/// Lifecycle for VPC peerings
pub struct PeeringResource {
    provider: Arc<Provider>,
}

impl PeeringResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> VpcPeeringHandler {
        VpcPeeringHandler::new(self.provider.client().clone())
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &PeeringConfig) -> Result<()> {
        match config {
            PeeringConfig::Aws(aws) => {
                match (&aws.vpc_cidr, aws.vpc_cidrs.is_empty()) {
                    (Some(_), false) => {
                        return Err(ProviderError::Invalid(
                            "vpc_cidr and vpc_cidrs cannot both be set".to_string(),
                        ));
                    }
                    (None, true) => {
                        return Err(ProviderError::Invalid(
                            "one of vpc_cidr or vpc_cidrs is required".to_string(),
                        ));
                    }
                    _ => {}
                }
                if let Some(cidr) = &aws.vpc_cidr {
                    validate_cidr("vpc_cidr", cidr)?;
                }
                for cidr in &aws.vpc_cidrs {
                    validate_cidr("vpc_cidrs", cidr)?;
                }
                if aws.aws_account_id.is_empty() || aws.vpc_id.is_empty() {
                    return Err(ProviderError::Invalid(
                        "aws_account_id and vpc_id are required".to_string(),
                    ));
                }
            }
            PeeringConfig::Gcp(gcp) => {
                if gcp.gcp_project_id.is_empty() || gcp.gcp_network_name.is_empty() {
                    return Err(ProviderError::Invalid(
                        "gcp_project_id and gcp_network_name are required".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn build_create_request(config: &PeeringConfig) -> VpcPeeringCreateRequest {
        match config {
            PeeringConfig::Aws(aws) => VpcPeeringCreateRequest {
                provider: Some("AWS".to_string()),
                source_region: aws.source_region.clone(),
                destination_region: Some(aws.destination_region.clone()),
                aws_account_id: Some(aws.aws_account_id.clone()),
                vpc_id: Some(aws.vpc_id.clone()),
                vpc_cidr: aws.vpc_cidr.clone(),
                vpc_cidrs: aws.vpc_cidrs.clone(),
                ..Default::default()
            },
            PeeringConfig::Gcp(gcp) => VpcPeeringCreateRequest {
                provider: Some("GCP".to_string()),
                source_region: gcp.source_region.clone(),
                vpc_project_uid: Some(gcp.gcp_project_id.clone()),
                vpc_network_name: Some(gcp.gcp_network_name.clone()),
                ..Default::default()
            },
        }
    }

    /// Create the peering and wait until it leaves `initiating-request`
    pub async fn create(
        &self,
        subscription: SubscriptionId,
        config: &PeeringConfig,
    ) -> Result<PeeringState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(subscription.0).await;

        let request = Self::build_create_request(config);
        let timeouts = self.provider.timeouts().clone();
        info!(%subscription, "creating VPC peering");
        let task = self.handler().create(subscription.0, &request).await?;
        let task_id = task
            .task_id
            .ok_or_else(|| ProviderError::Internal("create returned no task id".to_string()))?;
        let completed = wait_for_task(
            self.provider.client(),
            &task_id,
            timeouts.peering,
            timeouts.poll_interval,
        )
        .await?;
        let id = PeeringId {
            subscription: subscription.0,
            peering: task_resource_id(&completed)?,
        };
        debug!(%id, "peering created, waiting for initiation to settle");

        let peering = self.wait_until_initiated(id, timeouts.peering).await?;
        Ok(flatten(id, peering))
    }

    async fn wait_until_initiated(&self, id: PeeringId, timeout: Duration) -> Result<VpcPeering> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "peering",
            id: id.to_string(),
            pending: vec![PEERING_STATUS_INITIATING, STATE_MISSING],
            target: vec![
                PEERING_STATUS_ACTIVE,
                PEERING_STATUS_PENDING_ACCEPTANCE,
                PEERING_STATUS_INACTIVE,
            ],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                let peerings = handler.list(id.subscription).await?;
                match peerings
                    .into_iter()
                    .find(|p| p.vpc_peering_id == Some(id.peering))
                {
                    Some(peering) => {
                        let status = peering.status.clone().unwrap_or_default();
                        Ok((peering, status))
                    }
                    None => Ok((VpcPeering::default(), STATE_MISSING.to_string())),
                }
            }
        })
        .await
    }

    /// Read the peering; `None` means it no longer exists
    pub async fn read(&self, id: PeeringId) -> Result<Option<PeeringState>> {
        let peerings = match self.handler().list(id.subscription).await {
            Ok(peerings) => peerings,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(peerings
            .into_iter()
            .find(|p| p.vpc_peering_id == Some(id.peering))
            .map(|peering| flatten(id, peering)))
    }

    /// Delete the peering
    pub async fn delete(&self, id: PeeringId) -> Result<()> {
        let _guard = self.provider.lock_subscription(id.subscription).await;
        let timeouts = self.provider.timeouts().clone();
        info!(%id, "deleting VPC peering");
        let task = match self.handler().delete(id.subscription, id.peering).await {
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

/// Flatten the wire peering, normalizing the single-vs-multi CIDR forms
fn flatten(id: PeeringId, peering: VpcPeering) -> PeeringState {
    let (vpc_cidr, vpc_cidrs) = match (&peering.vpc_cidr, peering.vpc_cidrs.as_slice()) {
        (Some(single), []) => (Some(single.clone()), vec![single.clone()]),
        (None, [only]) => (Some(only.clone()), vec![only.clone()]),
        (single, many) => (single.clone(), many.to_vec()),
    };
    PeeringState {
        id,
        status: peering.status.unwrap_or_default(),
        aws_account_id: peering.aws_account_id,
        aws_peering_uid: peering.aws_peering_uid,
        vpc_id: peering.vpc_id,
        vpc_cidr,
        vpc_cidrs,
        source_region: peering.source_region,
        destination_region: peering.destination_region,
        gcp_project_id: peering.vpc_project_uid,
        gcp_network_name: peering.vpc_network_name,
        gcp_redis_project_id: peering.redis_project_uid,
        gcp_redis_network_name: peering.redis_network_name,
        cloud_peering_id: peering.cloud_peering_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aws_config() -> PeeringConfig {
        PeeringConfig::Aws(AwsPeeringConfig {
            source_region: Some("us-east-1".to_string()),
            destination_region: "us-west-2".to_string(),
            aws_account_id: "123456789012".to_string(),
            vpc_id: "vpc-0f1e2d3c".to_string(),
            vpc_cidr: Some("10.10.0.0/24".to_string()),
            vpc_cidrs: Vec::new(),
        })
    }

    #[test]
    fn test_validate_aws_cidr_forms_exclusive() {
        PeeringResource::validate(&aws_config()).unwrap();

        let both = PeeringConfig::Aws(AwsPeeringConfig {
            vpc_cidrs: vec!["10.10.1.0/24".to_string()],
            ..match aws_config() {
                PeeringConfig::Aws(aws) => aws,
                PeeringConfig::Gcp(_) => unreachable!(),
            }
        });
        assert!(PeeringResource::validate(&both).is_err());

        let neither = PeeringConfig::Aws(AwsPeeringConfig {
            vpc_cidr: None,
            ..match aws_config() {
                PeeringConfig::Aws(aws) => aws,
                PeeringConfig::Gcp(_) => unreachable!(),
            }
        });
        assert!(PeeringResource::validate(&neither).is_err());
    }

    #[test]
    fn test_validate_gcp_requires_network() {
        let config = PeeringConfig::Gcp(GcpPeeringConfig {
            gcp_project_id: "my-project".to_string(),
            gcp_network_name: String::new(),
            source_region: None,
        });
        assert!(PeeringResource::validate(&config).is_err());
    }

    #[test]
    fn test_flatten_normalizes_single_cidr() {
        let id = PeeringId {
            subscription: 1,
            peering: 7,
        };
        let state = flatten(
            id,
            VpcPeering {
                vpc_peering_id: Some(7),
                status: Some("active".to_string()),
                vpc_cidr: Some("10.10.0.0/24".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(state.vpc_cidr.as_deref(), Some("10.10.0.0/24"));
        assert_eq!(state.vpc_cidrs, vec!["10.10.0.0/24".to_string()]);
    }

    #[test]
    fn test_flatten_normalizes_one_element_list() {
        let id = PeeringId {
            subscription: 1,
            peering: 7,
        };
        let state = flatten(
            id,
            VpcPeering {
                vpc_peering_id: Some(7),
                vpc_cidrs: vec!["10.10.0.0/24".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(state.vpc_cidr.as_deref(), Some("10.10.0.0/24"));
        assert_eq!(state.vpc_cidrs.len(), 1);
    }

    #[test]
    fn test_flatten_keeps_multi_cidr_list() {
        let id = PeeringId {
            subscription: 1,
            peering: 7,
        };
        let state = flatten(
            id,
            VpcPeering {
                vpc_peering_id: Some(7),
                vpc_cidrs: vec!["10.10.0.0/24".to_string(), "10.10.1.0/24".to_string()],
                ..Default::default()
            },
        );
        assert!(state.vpc_cidr.is_none());
        assert_eq!(state.vpc_cidrs.len(), 2);
    }
}
