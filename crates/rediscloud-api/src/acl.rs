//! Access-control rule endpoints

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;
use crate::tasks::TaskStateUpdate;

/// A Redis ACL rule as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AclRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The rule body in Redis ACL syntax
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
}

/// Request body for creating or updating a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AclRuleRequest {
    pub name: String,
    pub redis_rule: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleList {
    #[serde(default)]
    redis_rules: Vec<AclRule>,
}

/// Handler for the `/acl/redisRules` endpoints
pub struct AclHandler {
    client: CloudClient,
}

impl AclHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Create a rule; answers with a task
    pub async fn create_rule(&self, request: &AclRuleRequest) -> Result<TaskStateUpdate> {
        self.client.post("/acl/redisRules", request).await
    }

    /// List all rules, built-ins included
    pub async fn list_rules(&self) -> Result<Vec<AclRule>> {
        let list: RuleList = self.client.get("/acl/redisRules").await?;
        Ok(list.redis_rules)
    }

    /// Update a rule; answers with a task
    pub async fn update_rule(&self, rule_id: i64, request: &AclRuleRequest) -> Result<TaskStateUpdate> {
        self.client
            .put(&format!("/acl/redisRules/{rule_id}"), request)
            .await
    }

    /// Delete a rule; answers with a task
    pub async fn delete_rule(&self, rule_id: i64) -> Result<TaskStateUpdate> {
        self.client.delete(&format!("/acl/redisRules/{rule_id}")).await
    }
}
