//! Private Service Connect lifecycle
//!
//! A PSC service progresses create-queued → initialized → create-pending →
//! active; the subscription itself briefly leaves `active` while the service
//! provisions, so service creation re-waits for the subscription afterward.
//! Endpoints are child resources of the service and appear in its listing
//! once the GCP-side connection is created.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rediscloud_api::PscHandler;
use rediscloud_api::connectivity::psc::{
    PSC_STATUS_ACTIVE, PSC_STATUS_CREATE_PENDING, PSC_STATUS_CREATE_QUEUED, PSC_STATUS_INITIALIZED,
    PscEndpoint, PscEndpointRequest, PscService,
};
use tracing::info;

use crate::error::{ProviderError, Result};
use crate::ids::SubscriptionId;
use crate::provider::Provider;
use crate::subscription::SubscriptionResource;
use crate::wait::{DEFAULT_ATTEMPT_TIMEOUT, StateChangeConf, wait_for_task};

/// Synthetic pending state while a created endpoint is not yet listed
const STATE_MISSING: &str = "missing";

/// Observed state of a PSC service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PscServiceState {
    pub subscription: i64,
    /// Region id for Active-Active subscriptions
    pub region: Option<i64>,
    pub service: i64,
    pub connection_host_name: Option<String>,
    pub service_attachment_name: Option<String>,
    pub status: String,
}

impl PscServiceState {
    /// Composite id: `sub/pscService`, or `sub/region/pscService` for
    /// Active-Active subscriptions
    #[must_use]
    pub fn id(&self) -> String {
        match self.region {
            Some(region) => format!("{}/{}/{}", self.subscription, region, self.service),
            None => format!("{}/{}", self.subscription, self.service),
        }
    }
}

/// Desired state of a PSC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PscEndpointConfig {
    pub gcp_project_id: String,
    pub gcp_vpc_name: String,
    pub gcp_vpc_subnet_name: String,
    pub endpoint_connection_name: String,
}

/// Observed state of a PSC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PscEndpointState {
    pub subscription: i64,
    pub region: Option<i64>,
    pub endpoint: i64,
    pub gcp_project_id: Option<String>,
    pub gcp_vpc_name: Option<String>,
    pub gcp_vpc_subnet_name: Option<String>,
    pub endpoint_connection_name: Option<String>,
    pub status: String,
}

/// Lifecycle for PSC services and endpoints
pub struct PscResource {
    provider: Arc<Provider>,
}

impl PscResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> PscHandler {
        PscHandler::new(self.provider.client().clone())
    }

    /// Create the subscription's PSC service and wait until it is active
    pub async fn create_service(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
    ) -> Result<PscServiceState> {
        let _guard = self.provider.lock_subscription(subscription.0).await;
        let timeouts = self.provider.timeouts().clone();

        info!(%subscription, ?region, "creating PSC service");
        let task = self.handler().create_service(subscription.0, region).await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.psc_create,
                timeouts.poll_interval,
            )
            .await?;
        }

        let service = self
            .wait_service_active(subscription, region, timeouts.psc_create)
            .await?;
        // Provisioning the service endpoint churns the subscription too.
        SubscriptionResource::new(Arc::clone(&self.provider))
            .wait_until_active(subscription, timeouts.subscription_change)
            .await?;

        flatten_service(subscription.0, region, service)
    }

    async fn wait_service_active(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
        timeout: Duration,
    ) -> Result<PscService> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "PSC service",
            id: subscription.to_string(),
            pending: vec![
                PSC_STATUS_CREATE_QUEUED,
                PSC_STATUS_INITIALIZED,
                PSC_STATUS_CREATE_PENDING,
            ],
            target: vec![PSC_STATUS_ACTIVE],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                let service = handler.get_service(subscription.0, region).await?;
                let status = service.status.clone().unwrap_or_default();
                Ok((service, status))
            }
        })
        .await
    }

    /// Read the PSC service; `None` means it no longer exists
    pub async fn read_service(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
    ) -> Result<Option<PscServiceState>> {
        match self.handler().get_service(subscription.0, region).await {
            Ok(service) => Ok(Some(flatten_service(subscription.0, region, service)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the PSC service
    pub async fn delete_service(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
    ) -> Result<()> {
        let _guard = self.provider.lock_subscription(subscription.0).await;
        let timeouts = self.provider.timeouts().clone();
        info!(%subscription, ?region, "deleting PSC service");
        let task = match self.handler().delete_service(subscription.0, region).await {
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

    /// Create an endpoint on the PSC service and wait for it to appear
    pub async fn create_endpoint(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
        config: &PscEndpointConfig,
    ) -> Result<PscEndpointState> {
        let _guard = self.provider.lock_subscription(subscription.0).await;
        let timeouts = self.provider.timeouts().clone();

        let request = PscEndpointRequest {
            gcp_project_id: config.gcp_project_id.clone(),
            gcp_vpc_name: config.gcp_vpc_name.clone(),
            gcp_vpc_subnet_name: config.gcp_vpc_subnet_name.clone(),
            endpoint_connection_name: config.endpoint_connection_name.clone(),
        };
        info!(%subscription, ?region, "creating PSC endpoint");
        let task = self
            .handler()
            .create_endpoint(subscription.0, region, &request)
            .await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.psc_create,
                timeouts.poll_interval,
            )
            .await?;
        }

        let endpoint = self
            .wait_endpoint_appearance(subscription, region, config, timeouts.psc_create)
            .await?;
        flatten_endpoint(subscription.0, region, endpoint)
    }

    async fn wait_endpoint_appearance(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
        config: &PscEndpointConfig,
        timeout: Duration,
    ) -> Result<PscEndpoint> {
        let handler = self.handler();
        let connection_name = config.endpoint_connection_name.clone();
        let conf = StateChangeConf {
            resource: "PSC endpoint",
            id: format!("{subscription}/{connection_name}"),
            pending: vec![STATE_MISSING],
            // Any listed status counts as appeared; activation completes
            // only after the user runs the GCP-side creation script.
            target: vec![
                PSC_STATUS_ACTIVE,
                PSC_STATUS_INITIALIZED,
                PSC_STATUS_CREATE_PENDING,
                PSC_STATUS_CREATE_QUEUED,
            ],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            let connection_name = connection_name.clone();
            async move {
                let endpoints = handler.list_endpoints(subscription.0, region).await?;
                match endpoints
                    .into_iter()
                    .find(|e| e.endpoint_connection_name.as_deref() == Some(&connection_name))
                {
                    Some(endpoint) => {
                        let status = endpoint.status.clone().unwrap_or_default();
                        Ok((endpoint, status))
                    }
                    None => Ok((PscEndpoint::default(), STATE_MISSING.to_string())),
                }
            }
        })
        .await
    }

    /// Read an endpoint by id; `None` means it no longer exists
    pub async fn read_endpoint(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
        endpoint_id: i64,
    ) -> Result<Option<PscEndpointState>> {
        let endpoints = match self.handler().list_endpoints(subscription.0, region).await {
            Ok(endpoints) => endpoints,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        endpoints
            .into_iter()
            .find(|e| e.id == Some(endpoint_id))
            .map(|endpoint| flatten_endpoint(subscription.0, region, endpoint))
            .transpose()
    }

    /// Delete an endpoint
    pub async fn delete_endpoint(
        &self,
        subscription: SubscriptionId,
        region: Option<i64>,
        endpoint_id: i64,
    ) -> Result<()> {
        let _guard = self.provider.lock_subscription(subscription.0).await;
        let timeouts = self.provider.timeouts().clone();
        info!(%subscription, ?region, endpoint_id, "deleting PSC endpoint");
        let task = match self
            .handler()
            .delete_endpoint(subscription.0, region, endpoint_id)
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

fn flatten_service(
    subscription: i64,
    region: Option<i64>,
    service: PscService,
) -> Result<PscServiceState> {
    Ok(PscServiceState {
        subscription,
        region,
        service: service
            .id
            .ok_or_else(|| ProviderError::Internal("PSC service has no id".to_string()))?,
        connection_host_name: service.connection_host_name,
        service_attachment_name: service.service_attachment_name,
        status: service.status.unwrap_or_default(),
    })
}

fn flatten_endpoint(
    subscription: i64,
    region: Option<i64>,
    endpoint: PscEndpoint,
) -> Result<PscEndpointState> {
    Ok(PscEndpointState {
        subscription,
        region,
        endpoint: endpoint
            .id
            .ok_or_else(|| ProviderError::Internal("PSC endpoint has no id".to_string()))?,
        gcp_project_id: endpoint.gcp_project_id,
        gcp_vpc_name: endpoint.gcp_vpc_name,
        gcp_vpc_subnet_name: endpoint.gcp_vpc_subnet_name,
        endpoint_connection_name: endpoint.endpoint_connection_name,
        status: endpoint.status.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_id_arity() {
        let mut state = PscServiceState {
            subscription: 12,
            region: None,
            service: 77,
            connection_host_name: None,
            service_attachment_name: None,
            status: "active".to_string(),
        };
        assert_eq!(state.id(), "12/77");
        state.region = Some(3);
        assert_eq!(state.id(), "12/3/77");
    }

    #[test]
    fn test_flatten_service_requires_id() {
        let err = flatten_service(12, None, PscService::default()).unwrap_err();
        assert!(matches!(err, ProviderError::Internal(_)));
    }
}
