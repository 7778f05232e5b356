//! Database lifecycle
//!
//! Mutations lock the parent subscription, wait for it to be active, fire
//! the REST call, and poll the returned task plus the database state until
//! both settle. Alerts reconcile set-wise by name; modules are create-time
//! attributes where only additions can be applied in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rediscloud_api::DatabaseHandler;
use rediscloud_api::databases::{
    DATABASE_STATUS_ACTIVE, DATABASE_STATUS_CHANGE_PENDING, DATABASE_STATUS_PENDING, Database,
    DatabaseAlert, DatabaseCreateRequest, DatabaseUpdateRequest, RemoteBackup,
};
use rediscloud_api::subscriptions::{ModuleSpec, ThroughputMeasurement};
use tracing::{debug, info};

use crate::error::{ProviderError, Result};
use crate::ids::{DatabaseId, SubscriptionId};
use crate::password::generate_password;
use crate::provider::Provider;
use crate::subscription::SubscriptionResource;
use crate::wait::{DEFAULT_ATTEMPT_TIMEOUT, StateChangeConf, task_resource_id, wait_for_task};

/// Synthetic state reported once a deleted database stops resolving
const STATE_DELETED: &str = "deleted";

/// Backup intervals that accept a `time_utc`
const TIMED_BACKUP_INTERVALS: &[&str] = &["every-12-hours", "every-24-hours"];
/// All supported backup intervals
const BACKUP_INTERVALS: &[&str] = &[
    "every-1-hours",
    "every-6-hours",
    "every-12-hours",
    "every-24-hours",
];

/// Database wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Redis,
    Memcached,
}

impl Protocol {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Redis => "redis",
            Protocol::Memcached => "memcached",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "redis" => Ok(Protocol::Redis),
            "memcached" => Ok(Protocol::Memcached),
            other => Err(ProviderError::Invalid(format!(
                "protocol must be \"redis\" or \"memcached\", got {other:?}"
            ))),
        }
    }
}

/// Desired state of a database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    pub protocol: Protocol,
    pub memory_limit_in_gb: Option<f64>,
    pub dataset_size_in_gb: Option<f64>,
    pub data_persistence: Option<String>,
    pub data_eviction: Option<String>,
    pub replication: bool,
    pub throughput: Option<ThroughputMeasurement>,
    pub average_item_size_in_bytes: Option<i64>,
    pub modules: Vec<String>,
    pub alerts: Vec<DatabaseAlert>,
    /// Auto-generated for `redis`-protocol databases when omitted
    pub password: Option<String>,
    pub enable_tls: bool,
    pub client_ssl_certificate: Option<String>,
    pub client_tls_certificates: Vec<String>,
    /// "resp2" or "resp3"
    pub resp_version: Option<String>,
    pub port: Option<i64>,
    pub backup: Option<RemoteBackup>,
    pub enable_default_user: bool,
    pub source_ips: Vec<String>,
    /// Endpoint URIs of databases this one replicates
    pub replica_of: Vec<String>,
}

/// Observed state of a database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseState {
    pub id: DatabaseId,
    pub name: String,
    pub protocol: Option<String>,
    pub status: String,
    pub memory_limit_in_gb: Option<f64>,
    pub dataset_size_in_gb: Option<f64>,
    pub data_persistence: Option<String>,
    pub data_eviction: Option<String>,
    pub replication: bool,
    pub throughput: Option<ThroughputMeasurement>,
    pub modules: Vec<String>,
    /// Sorted by name for deterministic diffs
    pub alerts: Vec<DatabaseAlert>,
    pub password: Option<String>,
    pub enable_tls: bool,
    pub enable_default_user: bool,
    pub public_endpoint: Option<String>,
    pub private_endpoint: Option<String>,
    pub port: Option<i64>,
    pub backup: Option<RemoteBackup>,
    pub source_ips: Vec<String>,
    pub replica_of: Vec<String>,
}

/// Alert changes needed to move `current` to `desired`
#[derive(Debug, Default, PartialEq)]
pub struct AlertDiff {
    pub to_add: Vec<DatabaseAlert>,
    pub to_update: Vec<DatabaseAlert>,
    pub to_remove: Vec<String>,
}

impl AlertDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the set-wise alert delta, keyed by alert name
#[must_use]
pub fn diff_alerts(current: &[DatabaseAlert], desired: &[DatabaseAlert]) -> AlertDiff {
    let current_by_name: HashMap<&str, i64> =
        current.iter().map(|a| (a.name.as_str(), a.value)).collect();
    let desired_names: HashMap<&str, i64> =
        desired.iter().map(|a| (a.name.as_str(), a.value)).collect();

    let mut diff = AlertDiff::default();
    for alert in desired {
        match current_by_name.get(alert.name.as_str()) {
            None => diff.to_add.push(alert.clone()),
            Some(value) if *value != alert.value => diff.to_update.push(alert.clone()),
            Some(_) => {}
        }
    }
    for alert in current {
        if !desired_names.contains_key(alert.name.as_str()) {
            diff.to_remove.push(alert.name.clone());
        }
    }
    diff
}

/// Lifecycle for standard databases
pub struct DatabaseResource {
    provider: Arc<Provider>,
}

impl DatabaseResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> DatabaseHandler {
        DatabaseHandler::new(self.provider.client().clone())
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &DatabaseConfig) -> Result<()> {
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
        if !config.enable_tls && !config.client_tls_certificates.is_empty() {
            return Err(ProviderError::Invalid(
                "TLS certificates may not be provided while enable_tls is false".to_string(),
            ));
        }
        if let Some(resp) = &config.resp_version {
            if resp != "resp2" && resp != "resp3" {
                return Err(ProviderError::Invalid(format!(
                    "resp_version must be \"resp2\" or \"resp3\", got {resp:?}"
                )));
            }
        }
        if let Some(port) = config.port {
            if !(10_000..=19_999).contains(&port) {
                return Err(ProviderError::Invalid(format!(
                    "port must be between 10000 and 19999, got {port}"
                )));
            }
        }
        if let Some(backup) = &config.backup {
            validate_backup(backup)?;
        }
        Ok(())
    }

    async fn wait_subscription_active(&self, subscription: SubscriptionId) -> Result<()> {
        SubscriptionResource::new(Arc::clone(&self.provider))
            .wait_until_active(subscription, self.provider.timeouts().subscription_change)
            .await?;
        Ok(())
    }

    pub(crate) async fn wait_until_active(&self, id: DatabaseId, timeout: Duration) -> Result<Database> {
        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "database",
            id: id.to_string(),
            pending: vec![DATABASE_STATUS_PENDING, DATABASE_STATUS_CHANGE_PENDING, "draft"],
            target: vec![DATABASE_STATUS_ACTIVE],
            delay: self.provider.timeouts().initial_delay,
            poll_interval: self.provider.timeouts().poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                let db = handler.get(id.subscription, id.database).await?;
                let status = db.status.clone().unwrap_or_default();
                Ok((db, status))
            }
        })
        .await
    }

    /// Create the database and wait until it is active
    pub async fn create(
        &self,
        subscription: SubscriptionId,
        config: &DatabaseConfig,
    ) -> Result<DatabaseState> {
        Self::validate(config)?;
        let _guard = self.provider.lock_subscription(subscription.0).await;
        self.wait_subscription_active(subscription).await?;

        // The service only protects redis-protocol databases with a default
        // user password; generate one so the state never carries an empty
        // credential.
        let password = match (&config.password, config.protocol) {
            (Some(password), _) => Some(password.clone()),
            (None, Protocol::Redis) => {
                debug!("no password supplied, generating one");
                Some(generate_password())
            }
            (None, Protocol::Memcached) => None,
        };

        let request = build_create_request(config, password.clone());
        let timeouts = self.provider.timeouts().clone();
        info!(%subscription, name = %config.name, "creating database");
        let task = self.handler().create(subscription.0, &request).await?;
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
        let observed = self.wait_until_active(id, timeouts.database).await?;

        // The create request carries the alert list, but older service
        // versions ignore parts of it; converge explicitly.
        let diff = diff_alerts(&observed.alerts, &config.alerts);
        if !diff.is_empty() {
            self.apply_alert_diff(id, &diff).await?;
            self.wait_until_active(id, timeouts.database).await?;
        }

        let mut state = self
            .read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("database {id} vanished after create")))?;
        state.password = password;
        Ok(state)
    }

    /// Read the database; `None` means it no longer exists
    pub async fn read(&self, id: DatabaseId) -> Result<Option<DatabaseState>> {
        match self.handler().get(id.subscription, id.database).await {
            Ok(db) => Ok(Some(flatten(id, db))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a configuration change to an existing database
    pub async fn update(
        &self,
        id: DatabaseId,
        prior: &DatabaseConfig,
        config: &DatabaseConfig,
    ) -> Result<DatabaseState> {
        Self::validate(config)?;

        // Modules are create-time: the service supports adding for some
        // families but never removing.
        for module in &prior.modules {
            if !config.modules.contains(module) {
                return Err(ProviderError::RequiresReplacement { attribute: "modules" });
            }
        }

        let _guard = self.provider.lock_subscription(id.subscription).await;
        self.wait_subscription_active(SubscriptionId(id.subscription)).await?;
        let timeouts = self.provider.timeouts().clone();

        if let Some(request) = build_update_request(prior, config) {
            info!(%id, "updating database");
            let task = self
                .handler()
                .update(id.subscription, id.database, &request)
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
            self.wait_until_active(id, timeouts.database).await?;
        }

        let diff = diff_alerts(&prior.alerts, &config.alerts);
        if !diff.is_empty() {
            self.apply_alert_diff(id, &diff).await?;
            self.wait_until_active(id, timeouts.database).await?;
        }

        if config.password != prior.password {
            if let Some(password) = &config.password {
                info!(%id, "rotating database password");
                let task = self
                    .handler()
                    .update_password(id.subscription, id.database, password)
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
                self.wait_until_active(id, timeouts.database).await?;
            }
        }

        let mut state = self
            .read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("database {id} vanished during update")))?;
        state.password = config.password.clone().or_else(|| prior.password.clone());
        Ok(state)
    }

    async fn apply_alert_diff(&self, id: DatabaseId, diff: &AlertDiff) -> Result<()> {
        debug!(
            %id,
            add = diff.to_add.len(),
            update = diff.to_update.len(),
            remove = diff.to_remove.len(),
            "reconciling alerts"
        );
        let handler = self.handler();
        let timeouts = self.provider.timeouts().clone();
        for alert in &diff.to_add {
            let task = handler.create_alert(id.subscription, id.database, alert).await?;
            self.wait_alert_task(task, &timeouts).await?;
        }
        for alert in &diff.to_update {
            let task = handler.update_alert(id.subscription, id.database, alert).await?;
            self.wait_alert_task(task, &timeouts).await?;
        }
        for name in &diff.to_remove {
            let task = handler.delete_alert(id.subscription, id.database, name).await?;
            self.wait_alert_task(task, &timeouts).await?;
        }
        Ok(())
    }

    async fn wait_alert_task(
        &self,
        task: rediscloud_api::tasks::TaskStateUpdate,
        timeouts: &crate::provider::ResourceTimeouts,
    ) -> Result<()> {
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.database,
                timeouts.poll_interval,
            )
            .await?;
        }
        Ok(())
    }

    /// Delete the database and wait until it stops resolving
    pub async fn delete(&self, id: DatabaseId) -> Result<()> {
        let _guard = self.provider.lock_subscription(id.subscription).await;
        let timeouts = self.provider.timeouts().clone();
        info!(%id, "deleting database");
        let task = match self.handler().delete(id.subscription, id.database).await {
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

        let handler = self.handler();
        let conf = StateChangeConf {
            resource: "database",
            id: id.to_string(),
            pending: vec![
                DATABASE_STATUS_ACTIVE,
                DATABASE_STATUS_PENDING,
                DATABASE_STATUS_CHANGE_PENDING,
            ],
            target: vec![STATE_DELETED],
            delay: Duration::ZERO,
            poll_interval: timeouts.poll_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            timeout: timeouts.delete,
        };
        conf.wait_for(|| {
            let handler = &handler;
            async move {
                match handler.get(id.subscription, id.database).await {
                    Ok(db) => Ok(((), db.status.unwrap_or_default())),
                    Err(e) if e.is_not_found() => Ok(((), STATE_DELETED.to_string())),
                    Err(e) => Err(e.into()),
                }
            }
        })
        .await
    }
}

fn validate_backup(backup: &RemoteBackup) -> Result<()> {
    if !BACKUP_INTERVALS.contains(&backup.interval.as_str()) {
        return Err(ProviderError::Invalid(format!(
            "backup interval must be one of {BACKUP_INTERVALS:?}, got {:?}",
            backup.interval
        )));
    }
    if let Some(time_utc) = &backup.time_utc {
        if !TIMED_BACKUP_INTERVALS.contains(&backup.interval.as_str()) {
            return Err(ProviderError::Invalid(
                "time_utc can only be set when interval is every-24-hours or every-12-hours"
                    .to_string(),
            ));
        }
        validate_time_of_day(time_utc)?;
    }
    Ok(())
}

fn validate_time_of_day(value: &str) -> Result<()> {
    let valid = match value.split_once(':') {
        Some((hours, minutes)) => {
            matches!(hours.parse::<u8>(), Ok(h) if h < 24)
                && matches!(minutes.parse::<u8>(), Ok(m) if m < 60)
                && hours.len() == 2
                && minutes.len() == 2
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ProviderError::Invalid(format!(
            "time_utc must be \"HH:MM\" in 24-hour time, got {value:?}"
        )))
    }
}

fn build_create_request(config: &DatabaseConfig, password: Option<String>) -> DatabaseCreateRequest {
    DatabaseCreateRequest {
        name: config.name.clone(),
        protocol: Some(config.protocol.as_str().to_string()),
        port: config.port,
        memory_limit_in_gb: config.memory_limit_in_gb,
        dataset_size_in_gb: config.dataset_size_in_gb,
        average_item_size_in_bytes: config.average_item_size_in_bytes,
        resp_version: config.resp_version.clone(),
        support_oss_cluster_api: None,
        use_external_endpoint_for_oss_cluster_api: None,
        data_persistence: config.data_persistence.clone(),
        data_eviction_policy: config.data_eviction.clone(),
        replication: Some(config.replication),
        throughput_measurement: config.throughput.clone(),
        replica_of: config.replica_of.clone(),
        remote_backup: config.backup.clone(),
        modules: config
            .modules
            .iter()
            .map(|name| ModuleSpec { name: name.clone() })
            .collect(),
        source_ips: config.source_ips.clone(),
        client_ssl_certificate: config.client_ssl_certificate.clone(),
        client_tls_certificates: config.client_tls_certificates.clone(),
        enable_tls: Some(config.enable_tls),
        password,
        alerts: config.alerts.clone(),
        enable_default_user: Some(config.enable_default_user),
    }
}

/// Build the update patch from the config delta; `None` when nothing beyond
/// alerts and password changed
fn build_update_request(
    prior: &DatabaseConfig,
    config: &DatabaseConfig,
) -> Option<DatabaseUpdateRequest> {
    let mut request = DatabaseUpdateRequest::default();
    let mut changed = false;

    if config.name != prior.name {
        request.name = Some(config.name.clone());
        changed = true;
    }
    if config.memory_limit_in_gb != prior.memory_limit_in_gb {
        request.memory_limit_in_gb = config.memory_limit_in_gb;
        changed = true;
    }
    if config.dataset_size_in_gb != prior.dataset_size_in_gb {
        request.dataset_size_in_gb = config.dataset_size_in_gb;
        changed = true;
    }
    if config.data_persistence != prior.data_persistence {
        request.data_persistence = config.data_persistence.clone();
        changed = true;
    }
    if config.data_eviction != prior.data_eviction {
        request.data_eviction_policy = config.data_eviction.clone();
        changed = true;
    }
    if config.replication != prior.replication {
        request.replication = Some(config.replication);
        changed = true;
    }
    if config.throughput != prior.throughput {
        request.throughput_measurement = config.throughput.clone();
        changed = true;
    }
    if config.resp_version != prior.resp_version {
        request.resp_version = config.resp_version.clone();
        changed = true;
    }
    if config.replica_of != prior.replica_of {
        request.replica_of = Some(config.replica_of.clone());
        changed = true;
    }
    if config.backup != prior.backup {
        request.remote_backup = config.backup.clone();
        changed = true;
    }
    if config.modules != prior.modules {
        request.modules = config
            .modules
            .iter()
            .map(|name| ModuleSpec { name: name.clone() })
            .collect();
        changed = true;
    }
    if config.source_ips != prior.source_ips {
        request.source_ips = Some(config.source_ips.clone());
        changed = true;
    }
    if config.enable_tls != prior.enable_tls
        || config.client_ssl_certificate != prior.client_ssl_certificate
        || config.client_tls_certificates != prior.client_tls_certificates
    {
        request.enable_tls = Some(config.enable_tls);
        request.client_ssl_certificate = config.client_ssl_certificate.clone();
        request.client_tls_certificates = Some(config.client_tls_certificates.clone());
        changed = true;
    }
    if config.enable_default_user != prior.enable_default_user {
        request.enable_default_user = Some(config.enable_default_user);
        changed = true;
    }

    changed.then_some(request)
}

fn flatten(id: DatabaseId, db: Database) -> DatabaseState {
    let security = db.security.unwrap_or_default();
    let mut alerts = db.alerts;
    alerts.sort();
    DatabaseState {
        id,
        name: db.name.unwrap_or_default(),
        protocol: db.protocol,
        status: db.status.unwrap_or_default(),
        memory_limit_in_gb: db.memory_limit_in_gb,
        dataset_size_in_gb: db.dataset_size_in_gb,
        data_persistence: db.data_persistence,
        data_eviction: db.data_eviction_policy,
        replication: db.replication.unwrap_or(false),
        throughput: db.throughput_measurement,
        modules: db.modules.into_iter().map(|m| m.name).collect(),
        alerts,
        password: security.password,
        enable_tls: security.enable_tls.unwrap_or(false),
        enable_default_user: security.enable_default_user.unwrap_or(true),
        public_endpoint: db.public_endpoint,
        private_endpoint: db.private_endpoint,
        port: db.port,
        backup: db.backup,
        source_ips: security.source_ips,
        replica_of: db.replica_of,
    }
}
