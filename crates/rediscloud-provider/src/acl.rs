//! ACL rule lifecycle

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rediscloud_api::AclHandler;
use rediscloud_api::acl::{AclRule, AclRuleRequest};
use tracing::info;

use crate::error::{ProviderError, Result};
use crate::ids::AclRuleId;
use crate::provider::Provider;
use crate::wait::{task_resource_id, wait_for_task};

/// Rule names the service ships with; they cannot be modified or deleted
const BUILT_IN_RULES: &[&str] = &["Full-Access", "Read-Write", "Read-Only"];

/// Desired state of an ACL rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRuleConfig {
    pub name: String,
    /// Rule body in Redis ACL syntax, e.g. `+@read ~cache:*`
    pub rule: String,
}

/// Observed state of an ACL rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRuleState {
    pub id: AclRuleId,
    pub name: String,
    pub rule: String,
}

/// Lifecycle for ACL rules
pub struct AclRuleResource {
    provider: Arc<Provider>,
}

impl AclRuleResource {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    fn handler(&self) -> AclHandler {
        AclHandler::new(self.provider.client().clone())
    }

    /// Validate a configuration before any API call
    pub fn validate(config: &AclRuleConfig) -> Result<()> {
        if config.name.is_empty() || config.rule.is_empty() {
            return Err(ProviderError::Invalid(
                "name and rule are required".to_string(),
            ));
        }
        if BUILT_IN_RULES.contains(&config.name.as_str()) {
            return Err(ProviderError::Invalid(format!(
                "{:?} is a built-in rule and cannot be managed",
                config.name
            )));
        }
        Ok(())
    }

    fn build_request(config: &AclRuleConfig) -> AclRuleRequest {
        AclRuleRequest {
            name: config.name.clone(),
            redis_rule: config.rule.clone(),
        }
    }

    /// Create the rule
    pub async fn create(&self, config: &AclRuleConfig) -> Result<AclRuleState> {
        Self::validate(config)?;
        let timeouts = self.provider.timeouts().clone();

        info!(name = %config.name, "creating ACL rule");
        let task = self.handler().create_rule(&Self::build_request(config)).await?;
        let task_id = task
            .task_id
            .ok_or_else(|| ProviderError::Internal("create returned no task id".to_string()))?;
        let completed = wait_for_task(
            self.provider.client(),
            &task_id,
            timeouts.read,
            timeouts.poll_interval,
        )
        .await?;
        let id = AclRuleId(task_resource_id(&completed)?);

        self.read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("ACL rule {id} vanished after create")))
    }

    /// Read the rule; `None` means it no longer exists
    pub async fn read(&self, id: AclRuleId) -> Result<Option<AclRuleState>> {
        let rules = self.handler().list_rules().await?;
        Ok(rules
            .into_iter()
            .find(|r| r.id == Some(id.0))
            .map(|rule| flatten(id, rule)))
    }

    /// Update the rule body or name
    pub async fn update(&self, id: AclRuleId, config: &AclRuleConfig) -> Result<AclRuleState> {
        Self::validate(config)?;
        let timeouts = self.provider.timeouts().clone();

        info!(%id, "updating ACL rule");
        let task = self
            .handler()
            .update_rule(id.0, &Self::build_request(config))
            .await?;
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.read,
                timeouts.poll_interval,
            )
            .await?;
        }
        self.read(id)
            .await?
            .ok_or_else(|| ProviderError::Internal(format!("ACL rule {id} vanished during update")))
    }

    /// Delete the rule
    pub async fn delete(&self, id: AclRuleId) -> Result<()> {
        let timeouts = self.provider.timeouts().clone();
        info!(%id, "deleting ACL rule");
        let task = match self.handler().delete_rule(id.0).await {
            Ok(task) => task,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if let Some(task_id) = task.task_id {
            wait_for_task(
                self.provider.client(),
                &task_id,
                timeouts.read,
                timeouts.poll_interval,
            )
            .await?;
        }
        Ok(())
    }
}

fn flatten(id: AclRuleId, rule: AclRule) -> AclRuleState {
    AclRuleState {
        id,
        name: rule.name.unwrap_or_default(),
        rule: rule.acl.unwrap_or_default(),
    }
}
