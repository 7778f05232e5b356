//! Active-Active database lifecycle and override reconciliation
//!
//! An Active-Active database carries two tiers of settings: `global_*`
//! values applied everywhere, and per-region override blocks that shadow
//! them. The API erases the distinction on read (every region reports its
//! effective value, whether overridden or inherited), so the read path
//! rebuilds the override blocks from three inputs: the observed region
//! values, the globals, and the override blocks the user previously wrote.
//! A region value equal to the global is kept only if the prior state shows
//! the user explicitly wrote it; otherwise the field is omitted, so the
//! no-override case round-trips to the no-override representation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rediscloud_api::DatabaseHandler;
use rediscloud_api::databases::{
    ActiveActiveDatabaseCreateRequest, ActiveActiveDatabaseUpdateRequest, Database, DatabaseAlert,
    LocalRegionProperties,
};
use rediscloud_api::subscriptions::ModuleSpec;
use tracing::{debug, info};

use crate::database::DatabaseResource;
use crate::error::{ProviderError, Result};
use crate::ids::{DatabaseId, SubscriptionId};
use crate::provider::Provider;
use crate::subscription::SubscriptionResource;
use crate::wait::{task_resource_id, wait_for_task};

/// Globally-applied settings of an Active-Active database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub data_persistence: Option<String>,
    pub password: Option<String>,
    pub source_ips: Vec<String>,
    pub alerts: Vec<DatabaseAlert>,
    pub enable_default_user: bool,
    pub enable_tls: bool,
}

/// A per-region override block; `None` fields inherit the global value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOverride {
    pub region: String,
    pub data_persistence: Option<String>,
    pub password: Option<String>,
    pub source_ips: Option<Vec<String>>,
    pub alerts: Option<Vec<DatabaseAlert>>,
    pub enable_default_user: Option<bool>,
    pub enable_tls: Option<bool>,
}

impl RegionOverride {
    /// True when no field shadows the global value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_persistence.is_none()
            && self.password.is_none()
            && self.source_ips.is_none()
            && self.alerts.is_none()
            && self.enable_default_user.is_none()
            && self.enable_tls.is_none()
    }
}

/// Desired state of an Active-Active database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveActiveDatabaseConfig {
    pub name: String,
    pub memory_limit_in_gb: Option<f64>,
    pub dataset_size_in_gb: Option<f64>,
    pub global: GlobalSettings,
    pub override_regions: Vec<RegionOverride>,
    pub modules: Vec<String>,
    pub client_ssl_certificate: Option<String>,
    pub client_tls_certificates: Vec<String>,
    pub port: Option<i64>,
}

/// Per-region connection endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionEndpoints {
    pub region: String,
    pub public_endpoint: Option<String>,
    pub private_endpoint: Option<String>,
}

/// Observed state of an Active-Active database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveActiveDatabaseState {
    pub id: DatabaseId,
    pub name: String,
    pub status: String,
    pub memory_limit_in_gb: Option<f64>,
    pub dataset_size_in_gb: Option<f64>,
    pub global: GlobalSettings,
    /// Synthesized override blocks; see [`reconcile_overrides`]
    pub override_regions: Vec<RegionOverride>,
    pub regions: Vec<RegionEndpoints>,
}

fn same_set(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

fn same_alert_set(a: &[DatabaseAlert], b: &[DatabaseAlert]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Rebuild the override blocks from observed per-region values.
///
/// A field is emitted when the region's effective value differs from the
/// global, or when the prior state shows the user explicitly wrote an
/// override, even one equal to the global, which would otherwise be
/// indistinguishable from inheritance and flap on every refresh.
#[must_use]
pub fn reconcile_overrides(
    global: &GlobalSettings,
    prior: &[RegionOverride],
    observed: &[LocalRegionProperties],
) -> Vec<RegionOverride> {
    observed
        .iter()
        .map(|region| {
            let prior = prior.iter().find(|p| p.region == region.region);
            let mut block = RegionOverride {
                region: region.region.clone(),
                ..Default::default()
            };

            if let Some(value) = &region.data_persistence {
                if Some(value) != global.data_persistence.as_ref() {
                    block.data_persistence = Some(value.clone());
                } else if let Some(explicit) = prior.and_then(|p| p.data_persistence.clone()) {
                    block.data_persistence = Some(explicit);
                }
            }
            if let Some(value) = &region.password {
                if Some(value) != global.password.as_ref() {
                    block.password = Some(value.clone());
                } else if let Some(explicit) = prior.and_then(|p| p.password.clone()) {
                    block.password = Some(explicit);
                }
            }
            if let Some(value) = &region.source_ips {
                if !same_set(value, &global.source_ips) {
                    block.source_ips = Some(value.clone());
                } else if let Some(explicit) = prior.and_then(|p| p.source_ips.clone()) {
                    block.source_ips = Some(explicit);
                }
            }
            if let Some(value) = &region.alerts {
                if !same_alert_set(value, &global.alerts) {
                    block.alerts = Some(value.clone());
                } else if let Some(explicit) = prior.and_then(|p| p.alerts.clone()) {
                    block.alerts = Some(explicit);
                }
            }
            if let Some(value) = region.enable_default_user {
                if value != global.enable_default_user {
                    block.enable_default_user = Some(value);
                } else if let Some(explicit) = prior.and_then(|p| p.enable_default_user) {
                    block.enable_default_user = Some(explicit);
                }
            }
            if let Some(value) = region.enable_tls {
                if value != global.enable_tls {
                    block.enable_tls = Some(value);
                } else if let Some(explicit) = prior.and_then(|p| p.enable_tls) {
                    block.enable_tls = Some(explicit);
                }
            }
            block
        })
        .collect()
}

/// Project an override block onto the wire shape, carrying only set fields
fn region_write(block: &RegionOverride) -> LocalRegionProperties {
    LocalRegionProperties {
        region: block.region.clone(),
        data_persistence: block.data_persistence.clone(),
        password: block.password.clone(),
        source_ips: block.source_ips.clone(),
        alerts: block.alerts.clone(),
        enable_default_user: block.enable_default_user,
        enable_tls: block.enable_tls,
        ..Default::default()
    }
}

/// Lifecycle for Active-Active databases
pub struct ActiveActiveDatabaseResource {
    provider: Arc<Provider>,
}

impl ActiveActiveDatabaseResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> DatabaseHandler {
        DatabaseHandler::new(self.provider.client().clone())
    }

    fn database_resource(&self) -> DatabaseResource {
        DatabaseResource::new(Arc::clone(&self.provider))
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &ActiveActiveDatabaseConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(ProviderError::Invalid("name must not be empty".to_string()));
        }
        match (config.memory_limit_in_gb, config.dataset_size_in_gb) {
            (Some(_), Some(_)) => {
                return Err(ProviderError::Invalid(
                    "memory_limit_in_gb and dataset_size_in_gb cannot both be set".to_string(),
                ));
            }
            (None, None) => {
                return Err(ProviderError::Invalid(
                    "one of memory_limit_in_gb or dataset_size_in_gb is required".to_string(),
                ));
            }
            _ => {}
        }
        if config.client_ssl_certificate.is_some() && !config.client_tls_certificates.is_empty() {
            return Err(ProviderError::Invalid(
                "client_ssl_certificate and client_tls_certificates cannot both be set"
                    .to_string(),
            ));
        }
        if !config.global.enable_tls && !config.client_tls_certificates.is_empty() {
            return Err(ProviderError::Invalid(
                "TLS certificates may not be provided while enable_tls is false".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for block in &config.override_regions {
            if !seen.insert(block.region.as_str()) {
                return Err(ProviderError::Invalid(format!(
                    "override_region {:?} is declared more than once",
                    block.region
                )));
            }
        }
        Ok(())
    }

    /// Create the database, apply region overrides, and wait until active
    pub async fn create(
        &self,
        subscription: SubscriptionId,
        config: &ActiveActiveDatabaseConfig,
    ) -> Result<ActiveActiveDatabaseState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(subscription.0).await;
        SubscriptionResource::new(Arc::clone(&self.provider))
            .wait_until_active(subscription, self.provider.timeouts().subscription_change)
            .await?;

        let request = ActiveActiveDatabaseCreateRequest {
            name: config.name.clone(),
            protocol: Some("redis".to_string()),
            port: config.port,
            memory_limit_in_gb: config.memory_limit_in_gb,
            dataset_size_in_gb: config.dataset_size_in_gb,
            global_data_persistence: config.global.data_persistence.clone(),
            global_password: config.global.password.clone(),
            global_source_ips: config.global.source_ips.clone(),
            global_alerts: config.global.alerts.clone(),
            global_modules: config
                .modules
                .iter()
                .map(|name| ModuleSpec { name: name.clone() })
                .collect(),
            global_enable_default_user: Some(config.global.enable_default_user),
            enable_tls: Some(config.global.enable_tls),
            client_ssl_certificate: config.client_ssl_certificate.clone(),
            client_tls_certificates: config.client_tls_certificates.clone(),
            ..Default::default()
        };

        let timeouts = self.provider.timeouts().clone();
        info!(%subscription, name = %config.name, "creating active-active database");
        let task = self
            .handler()
            .create_active_active(subscription.0, &request)
            .await?;
        let task_id = task
            .task_id
            .ok_or_else(|| ProviderError::Internal("create returned no task id".to_string()))?;
        let completed = wait_for_task(
            self.provider.client(),
            &task_id,
            timeouts.database,
            timeouts.poll_interval,
        )
        .await?;
        let id = DatabaseId {
            subscription: subscription.0,
            database: task_resource_id(&completed)?,
        };
        self.database_resource()
            .wait_until_active(id, timeouts.database)
            .await?;

        let overrides: Vec<&RegionOverride> = config
            .override_regions
            .iter()
            .filter(|block| !block.is_empty())
            .collect();
        if !overrides.is_empty() {
            self.write_regions(id, &overrides).await?;
        }

        self.read(id, &config.override_regions)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("database {id} vanished after create")))
    }

    /// Issue one region-scoped update per override block.
    ///
    /// A failure aborts with the region's name; regions already written stay
    /// written and converge on the next apply.
    async fn write_regions(&self, id: DatabaseId, overrides: &[&RegionOverride]) -> Result<()> {
        let timeouts = self.provider.timeouts().clone();
        for block in overrides {
            debug!(%id, region = %block.region, "writing region override");
            let request = ActiveActiveDatabaseUpdateRequest {
                regions: vec![region_write(block)],
                ..Default::default()
            };
            let result: Result<()> = async {
                let task = self
                    .handler()
                    .update_active_active(id.subscription, id.database, &request)
                    .await?;
                if let Some(task_id) = task.task_id {
                    wait_for_task(
                        self.provider.client(),
                        &task_id,
                        timeouts.database,
                        timeouts.poll_interval,
                    )
                    .await?;
                }
                self.database_resource()
                    .wait_until_active(id, timeouts.database)
                    .await?;
                Ok(())
            }
            .await;
            result.map_err(|e| ProviderError::RegionWrite {
                region: block.region.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// Read the database, rebuilding override blocks against `prior`, the
    /// override blocks recorded in the host's prior state
    pub async fn read(
        &self,
        id: DatabaseId,
        prior: &[RegionOverride],
    ) -> Result<Option<ActiveActiveDatabaseState>> {
        let db = match self.handler().get(id.subscription, id.database).await {
            Ok(db) => db,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(flatten(id, db, prior)))
    }

    /// Apply a configuration change: global delta first, then one write per
    /// changed region override
    pub async fn update(
        &self,
        id: DatabaseId,
        prior: &ActiveActiveDatabaseConfig,
        config: &ActiveActiveDatabaseConfig,
    ) -> Result<ActiveActiveDatabaseState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(id.subscription).await;
        SubscriptionResource::new(Arc::clone(&self.provider))
            .wait_until_active(
                SubscriptionId(id.subscription),
                self.provider.timeouts().subscription_change,
            )
            .await?;
        let timeouts = self.provider.timeouts().clone();

        if let Some(request) = build_global_update(prior, config) {
            info!(%id, "updating active-active database globals");
            let task = self
                .handler()
                .update_active_active(id.subscription, id.database, &request)
                .await?;
            if let Some(task_id) = task.task_id {
                wait_for_task(
                    self.provider.client(),
                    &task_id,
                    timeouts.database,
                    timeouts.poll_interval,
                )
                .await?;
            }
            self.database_resource()
                .wait_until_active(id, timeouts.database)
                .await?;
        }

        let changed: Vec<&RegionOverride> = config
            .override_regions
            .iter()
            .filter(|block| {
                !block.is_empty()
                    && prior
                        .override_regions
                        .iter()
                        .find(|p| p.region == block.region)
                        != Some(*block)
            })
            .collect();
        if !changed.is_empty() {
            self.write_regions(id, &changed).await?;
        }

        self.read(id, &config.override_regions)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("database {id} vanished during update")))
    }

    /// Delete the database and wait until it stops resolving
    pub async fn delete(&self, id: DatabaseId) -> Result<()> {
        self.database_resource().delete(id).await
    }
}

/// Build the global-tier update from the config delta
fn build_global_update(
    prior: &ActiveActiveDatabaseConfig,
    config: &ActiveActiveDatabaseConfig,
) -> Option<ActiveActiveDatabaseUpdateRequest> {
    let mut request = ActiveActiveDatabaseUpdateRequest::default();
    let mut changed = false;

    if config.memory_limit_in_gb != prior.memory_limit_in_gb {
        request.memory_limit_in_gb = config.memory_limit_in_gb;
        changed = true;
    }
    if config.dataset_size_in_gb != prior.dataset_size_in_gb {
        request.dataset_size_in_gb = config.dataset_size_in_gb;
        changed = true;
    }
    if config.global.data_persistence != prior.global.data_persistence {
        request.global_data_persistence = config.global.data_persistence.clone();
        changed = true;
    }
    if config.global.password != prior.global.password {
        request.global_password = config.global.password.clone();
        changed = true;
    }
    if !same_set(&config.global.source_ips, &prior.global.source_ips) {
        request.global_source_ips = Some(config.global.source_ips.clone());
        changed = true;
    }
    if !same_alert_set(&config.global.alerts, &prior.global.alerts) {
        request.global_alerts = Some(config.global.alerts.clone());
        changed = true;
    }
    if config.global.enable_default_user != prior.global.enable_default_user {
        request.global_enable_default_user = Some(config.global.enable_default_user);
        changed = true;
    }
    if config.global.enable_tls != prior.global.enable_tls
        || config.client_ssl_certificate != prior.client_ssl_certificate
        || config.client_tls_certificates != prior.client_tls_certificates
    {
        request.enable_tls = Some(config.global.enable_tls);
        request.client_ssl_certificate = config.client_ssl_certificate.clone();
        request.client_tls_certificates = Some(config.client_tls_certificates.clone());
        changed = true;
    }

    changed.then_some(request)
}

fn flatten(id: DatabaseId, db: Database, prior: &[RegionOverride]) -> ActiveActiveDatabaseState {
    let security = db.security.unwrap_or_default();
    let global = GlobalSettings {
        data_persistence: db.data_persistence,
        password: security.password,
        source_ips: security.source_ips,
        alerts: db.alerts,
        enable_default_user: security.enable_default_user.unwrap_or(true),
        enable_tls: security.enable_tls.unwrap_or(false),
    };
    let override_regions = reconcile_overrides(&global, prior, &db.crdb_databases);
    let regions = db
        .crdb_databases
        .iter()
        .map(|region| RegionEndpoints {
            region: region.region.clone(),
            public_endpoint: region.public_endpoint.clone(),
            private_endpoint: region.private_endpoint.clone(),
        })
        .collect();
    ActiveActiveDatabaseState {
        id,
        name: db.name.unwrap_or_default(),
        status: db.status.unwrap_or_default(),
        memory_limit_in_gb: db.memory_limit_in_gb,
        dataset_size_in_gb: db.dataset_size_in_gb,
        global,
        override_regions,
        regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn global() -> GlobalSettings {
        GlobalSettings {
            data_persistence: Some("none".to_string()),
            password: Some("global-secret".to_string()),
            source_ips: vec!["10.0.0.0/24".to_string()],
            alerts: vec![DatabaseAlert {
                name: "dataset-size".to_string(),
                value: 80,
            }],
            enable_default_user: true,
            enable_tls: false,
        }
    }

    fn echoed_region(name: &str, global: &GlobalSettings) -> LocalRegionProperties {
        LocalRegionProperties {
            region: name.to_string(),
            data_persistence: global.data_persistence.clone(),
            password: global.password.clone(),
            source_ips: Some(global.source_ips.clone()),
            alerts: Some(global.alerts.clone()),
            enable_default_user: Some(global.enable_default_user),
            enable_tls: Some(global.enable_tls),
            ..Default::default()
        }
    }

    #[test]
    fn test_echoed_globals_produce_empty_overrides() {
        let global = global();
        let observed = vec![
            echoed_region("us-east-1", &global),
            echoed_region("us-east-2", &global),
        ];
        let blocks = reconcile_overrides(&global, &[], &observed);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(RegionOverride::is_empty));
        assert_eq!(blocks[0].region, "us-east-1");
    }

    #[test]
    fn test_differing_value_becomes_override() {
        let global = global();
        let mut region = echoed_region("us-east-1", &global);
        region.enable_default_user = Some(false);
        let blocks = reconcile_overrides(&global, &[], &[region, echoed_region("us-east-2", &global)]);
        assert_eq!(blocks[0].enable_default_user, Some(false));
        assert!(blocks[0].data_persistence.is_none());
        assert!(blocks[1].is_empty());
    }

    #[test]
    fn test_explicit_override_equal_to_global_is_preserved() {
        let global = global();
        let prior = vec![RegionOverride {
            region: "us-east-1".to_string(),
            enable_default_user: Some(true),
            ..Default::default()
        }];
        let observed = vec![echoed_region("us-east-1", &global)];
        let blocks = reconcile_overrides(&global, &prior, &observed);
        // The server echoes the global; the user's explicit intent survives.
        assert_eq!(blocks[0].enable_default_user, Some(true));
        assert!(blocks[0].password.is_none());
    }

    #[test]
    fn test_preservation_applies_to_every_field() {
        let global = global();
        let prior = vec![RegionOverride {
            region: "eu-west-1".to_string(),
            data_persistence: global.data_persistence.clone(),
            password: global.password.clone(),
            source_ips: Some(global.source_ips.clone()),
            alerts: Some(global.alerts.clone()),
            enable_tls: Some(false),
            ..Default::default()
        }];
        let observed = vec![echoed_region("eu-west-1", &global)];
        let blocks = reconcile_overrides(&global, &prior, &observed);
        assert_eq!(blocks[0].data_persistence, global.data_persistence);
        assert_eq!(blocks[0].password, global.password);
        assert_eq!(blocks[0].source_ips, Some(global.source_ips.clone()));
        assert_eq!(blocks[0].alerts, Some(global.alerts.clone()));
        assert_eq!(blocks[0].enable_tls, Some(false));
        // Never written by the user, still omitted.
        assert_eq!(blocks[0].enable_default_user, None);
    }

    #[test]
    fn test_source_ips_compared_as_sets() {
        let mut global = global();
        global.source_ips = vec!["10.0.0.0/24".to_string(), "10.0.1.0/24".to_string()];
        let mut region = echoed_region("us-east-1", &global);
        // Same members, different order: not an override.
        region.source_ips = Some(vec!["10.0.1.0/24".to_string(), "10.0.0.0/24".to_string()]);
        let blocks = reconcile_overrides(&global, &[], &[region]);
        assert!(blocks[0].source_ips.is_none());
    }

    #[test]
    fn test_region_alert_sets_compared_setwise() {
        let mut global = global();
        global.alerts = vec![
            DatabaseAlert {
                name: "dataset-size".to_string(),
                value: 80,
            },
            DatabaseAlert {
                name: "latency".to_string(),
                value: 5,
            },
        ];
        let mut region = echoed_region("ap-south-1", &global);
        region.alerts = Some(vec![
            DatabaseAlert {
                name: "latency".to_string(),
                value: 5,
            },
            DatabaseAlert {
                name: "dataset-size".to_string(),
                value: 80,
            },
        ]);
        let blocks = reconcile_overrides(&global, &[], &[region.clone()]);
        assert!(blocks[0].alerts.is_none());

        region.alerts = Some(vec![DatabaseAlert {
            name: "latency".to_string(),
            value: 9,
        }]);
        let blocks = reconcile_overrides(&global, &[], &[region]);
        assert!(blocks[0].alerts.is_some());
    }

    #[test]
    fn test_region_write_carries_only_set_fields() {
        let block = RegionOverride {
            region: "us-east-1".to_string(),
            enable_default_user: Some(false),
            ..Default::default()
        };
        let wire = region_write(&block);
        assert_eq!(wire.region, "us-east-1");
        assert_eq!(wire.enable_default_user, Some(false));
        assert!(wire.data_persistence.is_none());
        assert!(wire.alerts.is_none());
        assert!(wire.source_ips.is_none());
    }

    #[test]
    fn test_global_update_delta_only() {
        let prior = ActiveActiveDatabaseConfig {
            name: "geo".to_string(),
            memory_limit_in_gb: Some(1.0),
            dataset_size_in_gb: None,
            global: global(),
            override_regions: Vec::new(),
            modules: Vec::new(),
            client_ssl_certificate: None,
            client_tls_certificates: Vec::new(),
            port: None,
        };
        let mut next = prior.clone();
        next.global.enable_default_user = false;

        let request = build_global_update(&prior, &next).unwrap();
        assert_eq!(request.global_enable_default_user, Some(false));
        assert!(request.global_password.is_none());
        assert!(request.regions.is_empty());

        assert!(build_global_update(&prior, &prior.clone()).is_none());
    }

    #[test]
    fn test_validate_rejects_duplicate_regions() {
        let config = ActiveActiveDatabaseConfig {
            name: "geo".to_string(),
            memory_limit_in_gb: Some(1.0),
            dataset_size_in_gb: None,
            global: global(),
            override_regions: vec![
                RegionOverride {
                    region: "us-east-1".to_string(),
                    ..Default::default()
                },
                RegionOverride {
                    region: "us-east-1".to_string(),
                    ..Default::default()
                },
            ],
            modules: Vec::new(),
            client_ssl_certificate: None,
            client_tls_certificates: Vec::new(),
            port: None,
        };
        let err = ActiveActiveDatabaseResource::validate(&config).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
