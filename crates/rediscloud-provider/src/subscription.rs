//! Subscription lifecycle
//!
//! Create expands the user's creation plan into sizing databases, issues the
//! create request, and holds the caller until the subscription settles in
//! `active`. Allowlist and maintenance-window blocks are follow-up mutations
//! that each re-wait for `active`. The creation plan itself is write-only:
//! reads never populate it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use rediscloud_api::subscriptions::{
    CidrAllowlist, CloudProviderSpec, MaintenanceWindows, RegionNetworking, Subscription,
    SUBSCRIPTION_STATUS_ACTIVE, SUBSCRIPTION_STATUS_DELETING, SUBSCRIPTION_STATUS_PENDING,
    SubscriptionCreateRequest, SubscriptionRegion, SubscriptionUpdateRequest,
};
use rediscloud_api::{DatabaseHandler, SubscriptionHandler};
use tracing::{debug, info};

use crate::cidr::validate_cidr;
use crate::error::{ProviderError, Result};
use crate::ids::SubscriptionId;
use crate::plan::{CreationPlan, MemoryStorage, expand};
use crate::provider::Provider;
use crate::wait::{DEFAULT_ATTEMPT_TIMEOUT, StateChangeConf, task_resource_id, wait_for_task};

/// Synthetic state reported once a deleted subscription stops resolving
const STATE_DELETED: &str = "deleted";

/// Cloud provider of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudProvider {
    Aws,
    Gcp,
}

impl CloudProvider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AWS" => Ok(CloudProvider::Aws),
            "GCP" => Ok(CloudProvider::Gcp),
            other => Err(ProviderError::Invalid(format!(
                "cloud provider must be \"AWS\" or \"GCP\", got {other:?}"
            ))),
        }
    }
}

/// Payment method of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    CreditCard,
    Marketplace,
    Contract,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::Marketplace => "marketplace",
            PaymentMethod::Contract => "contract",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "credit-card" => Ok(PaymentMethod::CreditCard),
            "marketplace" => Ok(PaymentMethod::Marketplace),
            "contract" => Ok(PaymentMethod::Contract),
            other => Err(ProviderError::Invalid(format!(
                "payment_method must be one of \"credit-card\", \"marketplace\", \"contract\", got {other:?}"
            ))),
        }
    }
}

/// A region block of the cloud-provider declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub region: String,
    pub deployment_cidr: String,
    pub multiple_availability_zones: bool,
    pub preferred_availability_zones: Vec<String>,
}

/// The cloud-provider block of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudProviderConfig {
    pub provider: CloudProvider,
    /// Pre-existing cloud account to deploy into; None uses Redis-managed
    pub cloud_account_id: Option<i64>,
    pub regions: Vec<RegionConfig>,
}

/// Desired state of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    pub name: String,
    pub payment_method: PaymentMethod,
    pub payment_method_id: Option<i64>,
    pub memory_storage: MemoryStorage,
    pub cloud_provider: CloudProviderConfig,
    /// Write-only; required at create time, ignored on read
    pub creation_plan: Option<CreationPlan>,
    pub allowlist: Option<CidrAllowlist>,
    pub maintenance_windows: Option<MaintenanceWindows>,
    /// Geo-replicated deployment
    pub active_active: bool,
}

/// Observed state of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub id: SubscriptionId,
    pub name: String,
    pub status: String,
    pub payment_method: Option<String>,
    pub payment_method_id: Option<i64>,
    pub memory_storage: Option<String>,
    pub number_of_databases: i64,
    pub cloud_details: Vec<CloudProviderSpec>,
    /// Non-fatal findings from create (plan-expansion warnings)
    pub warnings: Vec<String>,
}

/// Lifecycle for standard and Active-Active subscriptions
pub struct SubscriptionResource {
    provider: Arc<Provider>,
}

impl SubscriptionResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> SubscriptionHandler {
        SubscriptionHandler::new(self.provider.client().clone())
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &SubscriptionConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(ProviderError::Invalid("name must not be empty".to_string()));
        }
        match config.payment_method {
            PaymentMethod::Marketplace | PaymentMethod::Contract => {
                if config.payment_method_id.is_some() {
                    return Err(ProviderError::Invalid(format!(
                        "payment_method_id cannot be set with payment_method {:?}",
                        config.payment_method.as_str()
                    )));
                }
            }
            PaymentMethod::CreditCard => {}
        }
        if config.cloud_provider.regions.is_empty() {
            return Err(ProviderError::Invalid(
                "cloud_provider requires at least one region".to_string(),
            ));
        }
        for region in &config.cloud_provider.regions {
            validate_cidr("deployment_cidr", &region.deployment_cidr)?;
        }
        if let Some(allowlist) = &config.allowlist {
            for cidr in &allowlist.cidr_ips {
                validate_cidr("allowlist.cidrs", cidr)?;
            }
        }
        Ok(())
    }

    fn build_create_request(
        config: &SubscriptionConfig,
        plan: &CreationPlan,
    ) -> Result<(SubscriptionCreateRequest, Vec<String>)> {
        let expanded = expand(config.memory_storage, plan)?;
        let request = SubscriptionCreateRequest {
            name: config.name.clone(),
            deployment_type: config.active_active.then(|| "active-active".to_string()),
            payment_method: Some(config.payment_method.as_str().to_string()),
            payment_method_id: config.payment_method_id,
            memory_storage: Some(config.memory_storage.as_str().to_string()),
            cloud_providers: vec![CloudProviderSpec {
                provider: Some(config.cloud_provider.provider.as_str().to_string()),
                cloud_account_id: config.cloud_provider.cloud_account_id,
                regions: config
                    .cloud_provider
                    .regions
                    .iter()
                    .map(|region| SubscriptionRegion {
                        region: region.region.clone(),
                        multiple_availability_zones: Some(region.multiple_availability_zones),
                        preferred_availability_zones: region.preferred_availability_zones.clone(),
                        networking: Some(RegionNetworking {
                            deployment_cidr: Some(region.deployment_cidr.clone()),
                            vpc_id: None,
                        }),
                    })
                    .collect(),
            }],
            databases: expanded.specs,
        };
        Ok((request, expanded.warnings))
    }

    /// Wait until the subscription reports `active`
    pub async fn wait_until_active(
        &self,
        id: SubscriptionId,
        timeout: Duration,
    ) -> Result<Subscription> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "subscription",
            id: id.to_string(),
            pending: vec![SUBSCRIPTION_STATUS_PENDING],
            target: vec![SUBSCRIPTION_STATUS_ACTIVE],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                let sub = handler.get(id.0).await?;
                let status = sub.status.clone().unwrap_or_default();
                Ok((sub, status))
            }
        })
        .await
    }

    /// Create the subscription and wait until it is active
    pub async fn create(&self, config: &SubscriptionConfig) -> Result<SubscriptionState> {
        Self::validate(config)?;
        let plan = config.creation_plan.as_ref().ok_or_else(|| {
            ProviderError::Invalid(
                "the creation_plan block is required when creating a subscription".to_string(),
            )
        })?;
        let (request, warnings) = Self::build_create_request(config, plan)?;

        let timeouts = self.provider.timeouts().clone();
        let handler = self.handler();
        info!(name = %config.name, "creating subscription");
        let task = handler.create(&request).await?;
        let task_id = task
            .task_id
            .ok_or_else(|| ProviderError::Internal("create returned no task id".to_string()))?;
        let completed = wait_for_task(
            self.provider.client(),
            &task_id,
            timeouts.subscription_create,
            timeouts.poll_interval,
        )
        .await?;
        let id = SubscriptionId(task_resource_id(&completed)?);
        debug!(%id, "subscription created, waiting for active");
        self.wait_until_active(id, timeouts.subscription_create).await?;

        if let Some(allowlist) = &config.allowlist {
            self.apply_allowlist(id, allowlist).await?;
        }
        if let Some(windows) = &config.maintenance_windows {
            self.apply_maintenance_windows(id, windows).await?;
        }

        let mut state = self
            .read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("subscription {id} vanished after create")))?;
        state.warnings = warnings;
        Ok(state)
    }

    async fn apply_allowlist(&self, id: SubscriptionId, allowlist: &CidrAllowlist) -> Result<()> {
        debug!(%id, "applying CIDR allowlist");
        let timeouts = self.provider.timeouts();
        let task = self.handler().update_cidr_allowlist(id.0, allowlist).await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.subscription_change,
                timeouts.poll_interval,
            )
            .await?;
        }
        self.wait_until_active(id, timeouts.subscription_change).await?;
        Ok(())
    }

    async fn apply_maintenance_windows(
        &self,
        id: SubscriptionId,
        windows: &MaintenanceWindows,
    ) -> Result<()> {
        debug!(%id, mode = %windows.mode, "applying maintenance windows");
        let timeouts = self.provider.timeouts();
        let task = self
            .handler()
            .update_maintenance_windows(id.0, windows)
            .await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.subscription_change,
                timeouts.poll_interval,
            )
            .await?;
        }
        self.wait_until_active(id, timeouts.subscription_change).await?;
        Ok(())
    }

    /// Read the subscription; `None` means it no longer exists and the host
    /// should plan a recreate
    pub async fn read(&self, id: SubscriptionId) -> Result<Option<SubscriptionState>> {
        match self.handler().get(id.0).await {
            Ok(sub) => Ok(Some(flatten(id, sub))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a configuration change to an existing subscription.
    ///
    /// Force-new attributes (memory storage, cloud-provider block, payment
    /// method type, deployment type) cannot be updated in place: changing
    /// them requires the creation plan to be re-declared and answers
    /// [`ProviderError::RequiresReplacement`] so the host recreates.
    pub async fn update(
        &self,
        id: SubscriptionId,
        prior: &SubscriptionConfig,
        config: &SubscriptionConfig,
    ) -> Result<SubscriptionState> {
        Self::validate(config)?;

        if let Some(attribute) = force_new_change(prior, config) {
            if config.creation_plan.is_none() {
                return Err(ProviderError::Invalid(format!(
                    "the creation_plan block is required when changing {attribute}"
                )));
            }
            return Err(ProviderError::RequiresReplacement { attribute });
        }

        let _guard = self.provider.lock_subscription(id.0).await;
        let timeouts = self.provider.timeouts().clone();

        if config.name != prior.name || config.payment_method_id != prior.payment_method_id {
            let request = SubscriptionUpdateRequest {
                name: (config.name != prior.name).then(|| config.name.clone()),
                payment_method_id: if config.payment_method_id != prior.payment_method_id {
                    config.payment_method_id
                } else {
                    None
                },
            };
            info!(%id, "updating subscription");
            let task = self.handler().update(id.0, &request).await?;
            if let Some(task_id) = task.task_id {
                wait_for_task(
                    self.provider.client(),
                    &task_id,
                    timeouts.subscription_change,
                    timeouts.poll_interval,
                )
                .await?;
            }
            self.wait_until_active(id, timeouts.subscription_change).await?;
        }

        if config.allowlist != prior.allowlist {
            if let Some(allowlist) = &config.allowlist {
                self.apply_allowlist(id, allowlist).await?;
            }
        }
        if config.maintenance_windows != prior.maintenance_windows {
            if let Some(windows) = &config.maintenance_windows {
                self.apply_maintenance_windows(id, windows).await?;
            }
        }

        self.read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("subscription {id} vanished during update")))
    }

    /// Delete the subscription after verifying no databases remain
    pub async fn delete(&self, id: SubscriptionId) -> Result<()> {
        let _guard = self.provider.lock_subscription(id.0).await;

        // The API would answer 409 with databases still attached; checking
        // first gives the user the offending names instead.
        let databases = match DatabaseHandler::new(self.provider.client().clone())
            .list(id.0)
            .await
        {
            Ok(databases) => databases,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if !databases.is_empty() {
            let names: Vec<String> = databases
                .iter()
                .map(|db| db.name.clone().unwrap_or_else(|| "<unnamed>".to_string()))
                .collect();
            return Err(ProviderError::Invalid(format!(
                "subscription {id} still contains databases [{}]; destroy them first",
                names.join(", ")
            )));
        }

        let timeouts = self.provider.timeouts().clone();
        info!(%id, "deleting subscription");
        let task = match self.handler().delete(id.0).await {
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
        self.wait_until_deleted(id, timeouts.delete).await
    }

    async fn wait_until_deleted(&self, id: SubscriptionId, timeout: Duration) -> Result<()> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "subscription",
            id: id.to_string(),
            pending: vec![
                SUBSCRIPTION_STATUS_ACTIVE,
                SUBSCRIPTION_STATUS_PENDING,
                SUBSCRIPTION_STATUS_DELETING,
            ],
            target: vec![STATE_DELETED],
            delay: Duration::ZERO,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                match handler.get(id.0).await {
                    Ok(sub) => Ok(((), sub.status.unwrap_or_default())),
                    Err(e) if e.is_not_found() => Ok(((), STATE_DELETED.to_string())),
                    Err(e) => Err(e.into()),
                }
            }
        })
        .await
    }
}

fn flatten(id: SubscriptionId, sub: Subscription) -> SubscriptionState {
    SubscriptionState {
        id,
        name: sub.name.unwrap_or_default(),
        status: sub.status.unwrap_or_default(),
        payment_method: sub.payment_method_type,
        payment_method_id: sub.payment_method_id,
        memory_storage: sub.memory_storage,
        number_of_databases: sub.number_of_databases.unwrap_or(0),
        cloud_details: sub.cloud_details,
        warnings: Vec::new(),
    }
}

fn force_new_change(
    prior: &SubscriptionConfig,
    config: &SubscriptionConfig,
) -> Option<&'static str> {
    if config.memory_storage != prior.memory_storage {
        Some("memory_storage")
    } else if config.cloud_provider != prior.cloud_provider {
        Some("cloud_provider")
    } else if config.payment_method != prior.payment_method {
        Some("payment_method")
    } else if config.active_active != prior.active_active {
        Some("deployment type")
    } else {
        None
    }
}
