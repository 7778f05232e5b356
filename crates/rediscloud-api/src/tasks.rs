//! Asynchronous task tracking
//!
//! Mutating API calls are fire-and-forget: they answer with a
//! [`TaskStateUpdate`] whose `task_id` must be polled until the task reaches
//! `processing-completed` or `processing-error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;

/// Task status: still queued or running
pub const TASK_STATUS_PENDING: &[&str] = &[
    "initialized",
    "received",
    "processing-in-progress",
];
/// Task status: finished successfully
pub const TASK_STATUS_COMPLETED: &str = "processing-completed";
/// Task status: finished with an error
pub const TASK_STATUS_ERROR: &str = "processing-error";

/// Error detail nested in a failed task response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskProcessingError {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result payload of a finished task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    /// Identifier of the resource the task created or mutated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskProcessingError>,
}

/// A task as reported by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<TaskResponse>,
}

impl TaskStateUpdate {
    /// The task's error description, if it carries one
    #[must_use]
    pub fn error_description(&self) -> Option<String> {
        let error = self.response.as_ref()?.error.as_ref()?;
        error
            .description
            .clone()
            .or_else(|| error.error_type.clone())
    }
}

/// Handler for the `/tasks` endpoints
pub struct TaskHandler {
    client: CloudClient,
}

impl TaskHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Fetch a task by id
    pub async fn get_task(&self, task_id: &str) -> Result<TaskStateUpdate> {
        self.client.get(&format!("/tasks/{task_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes_wire_shape() {
        let task: TaskStateUpdate = serde_json::from_str(
            r#"{
                "taskId": "b8b60e56-9c3b-4a2e-bb06-cf6e4c1f8f01",
                "commandType": "subscriptionCreateRequest",
                "status": "processing-completed",
                "response": {"resourceId": 1234}
            }"#,
        )
        .unwrap();
        assert_eq!(task.status.as_deref(), Some(TASK_STATUS_COMPLETED));
        assert_eq!(task.response.unwrap().resource_id, Some(1234));
    }

    #[test]
    fn test_error_description_prefers_description() {
        let task = TaskStateUpdate {
            response: Some(TaskResponse {
                resource_id: None,
                error: Some(TaskProcessingError {
                    error_type: Some("SUBSCRIPTION_POC_LIMIT".to_string()),
                    status: Some("400".to_string()),
                    description: Some("POC subscription limit reached".to_string()),
                }),
            }),
            ..Default::default()
        };
        assert_eq!(
            task.error_description().as_deref(),
            Some("POC subscription limit reached")
        );
    }

    #[test]
    fn test_error_description_absent() {
        assert_eq!(TaskStateUpdate::default().error_description(), None);
    }
}
