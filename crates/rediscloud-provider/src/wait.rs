//! Poll-until-target-state waiting
//!
//! Mutations against the management API are asynchronous twice over: the
//! call answers with a task, and the resource then transitions through its
//! own states after the task settles. [`StateChangeConf`] is the generic
//! poll loop both layers share; [`wait_for_task`] drives it for tasks.
//!
//! Cancellation is the caller dropping the future: the loop only suspends
//! at `.await` points (the sleeps and the refresh call), and every lock
//! guard held by the caller releases on drop.

use std::future::Future;
use std::time::Duration;

use rediscloud_api::tasks::{TASK_STATUS_COMPLETED, TASK_STATUS_ERROR, TASK_STATUS_PENDING};
use rediscloud_api::{CloudClient, TaskHandler};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{ProviderError, Result};

/// Configuration for one poll-until-target wait
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// Resource noun for error messages, e.g. "subscription"
    pub resource: &'static str,
    /// Resource id for error messages
    pub id: String,
    /// States that mean "keep polling"
    pub pending: Vec<&'static str>,
    /// States that end the wait successfully
    pub target: Vec<&'static str>,
    /// Sleep before the first refresh
    pub delay: Duration,
    /// Sleep between refreshes
    pub poll_interval: Duration,
    /// Bound on a single refresh call
    pub attempt_timeout: Duration,
    /// Bound on the whole wait
    pub timeout: Duration,
}

impl StateChangeConf {
    /// Poll `refresh` until it reports a target state, returning its payload.
    ///
    /// `refresh` reports `(payload, state)`. An error from `refresh` aborts
    /// the wait as-is; a state in neither set aborts with
    /// [`ProviderError::UnexpectedState`]. A refresh that wants "resource is
    /// missing" treated as still-pending reports a synthetic state listed in
    /// `pending` (see the TGW attachment wait); one that waits for deletion
    /// lists the synthetic state in `target` instead.
    pub async fn wait_for<T, F, Fut>(&self, mut refresh: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String)>>,
    {
        let start = Instant::now();
        debug!(
            resource = self.resource,
            id = %self.id,
            target = ?self.target,
            "waiting for state change"
        );

        tokio::time::sleep(self.delay).await;

        loop {
            if start.elapsed() >= self.timeout {
                return Err(self.timeout_error(start.elapsed()));
            }

            let (payload, state) = tokio::time::timeout(self.attempt_timeout, refresh())
                .await
                .map_err(|_| self.timeout_error(start.elapsed()))??;
            trace!(resource = self.resource, id = %self.id, state = %state, "observed state");

            if self.target.iter().any(|t| *t == state) {
                debug!(resource = self.resource, id = %self.id, state = %state, "reached target state");
                return Ok(payload);
            }
            if !self.pending.iter().any(|p| *p == state) {
                return Err(ProviderError::UnexpectedState {
                    resource: self.resource,
                    id: self.id.clone(),
                    state,
                });
            }

            let remaining = self.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(self.timeout_error(start.elapsed()));
            }
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    fn timeout_error(&self, elapsed: Duration) -> ProviderError {
        ProviderError::Timeout {
            resource: self.resource,
            id: self.id.clone(),
            target: self.target.join("|"),
            elapsed,
        }
    }
}

/// Default attempt timeout used by the provider's waits
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Poll an API task until it settles, returning the completed task.
///
/// A task reaching `processing-error` aborts with
/// [`ProviderError::TaskFailed`] carrying the task's error description.
pub async fn wait_for_task(
    client: &CloudClient,
    task_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<rediscloud_api::tasks::TaskStateUpdate> {
    let handler = TaskHandler::new(client.clone());
    let conf = StateChangeConf {
        resource: "task",
        id: task_id.to_string(),
        pending: TASK_STATUS_PENDING.to_vec(),
        target: vec![TASK_STATUS_COMPLETED],
        delay: Duration::ZERO,
        poll_interval,
        attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        timeout,
    };
    conf.wait_for(|| {
        let handler = &handler;
        async move {
            let task = handler.get_task(task_id).await?;
            let status = task.status.clone().unwrap_or_default();
            if status == TASK_STATUS_ERROR {
                let message = task
                    .error_description()
                    .unwrap_or_else(|| format!("task {task_id} failed"));
                return Err(ProviderError::TaskFailed(message));
            }
            Ok((task, status))
        }
    })
    .await
}

/// Extract the resource id a completed task points at
pub fn task_resource_id(task: &rediscloud_api::tasks::TaskStateUpdate) -> Result<i64> {
    task.response
        .as_ref()
        .and_then(|r| r.resource_id)
        .ok_or_else(|| {
            ProviderError::Internal(format!(
                "task {} completed without a resource id",
                task.task_id.as_deref().unwrap_or("<unknown>")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_conf(pending: Vec<&'static str>, target: Vec<&'static str>) -> StateChangeConf {
        StateChangeConf {
            resource: "widget",
            id: "42".to_string(),
            pending,
            target,
            delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
            timeout: Duration::from_millis(250),
        }
    }

    #[tokio::test]
    async fn test_reaches_target_after_pending() {
        let conf = quick_conf(vec!["pending"], vec!["active"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let result = conf
            .wait_for(|| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let state = if n < 3 { "pending" } else { "active" };
                    Ok((n, state.to_string()))
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_unexpected_state_aborts() {
        let conf = quick_conf(vec!["pending"], vec!["active"]);
        let err = conf
            .wait_for(|| async { Ok(((), "error".to_string())) })
            .await
            .unwrap_err();
        match err {
            ProviderError::UnexpectedState { state, .. } => assert_eq!(state, "error"),
            other => panic!("expected UnexpectedState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_error_aborts_without_retry() {
        let conf = quick_conf(vec!["pending"], vec!["active"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let err = conf
            .wait_for(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<((), String), _>(ProviderError::Internal("refresh broke".to_string()))
                }
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("refresh broke"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_names_resource_and_target() {
        let mut conf = quick_conf(vec!["pending"], vec!["active"]);
        conf.timeout = Duration::from_millis(20);
        let err = conf
            .wait_for(|| async { Ok(((), "pending".to_string())) })
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("widget"));
        assert!(message.contains("42"));
        assert!(message.contains("active"));
    }

    #[tokio::test]
    async fn test_missing_as_pending_until_appearance() {
        // The TGW-style wait: the refresh reports "missing" while the list
        // comes back empty and the waiter keeps polling.
        let conf = quick_conf(vec!["missing", "pending-acceptance"], vec!["active"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let result = conf
            .wait_for(|| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let state = match n {
                        0 | 1 => "missing",
                        2 => "pending-acceptance",
                        _ => "active",
                    };
                    Ok((n, state.to_string()))
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
    }

    #[test]
    fn test_task_resource_id_missing_is_internal() {
        let task = rediscloud_api::tasks::TaskStateUpdate::default();
        let err = task_resource_id(&task).unwrap_err();
        assert!(matches!(err, ProviderError::Internal(_)));
    }
}
