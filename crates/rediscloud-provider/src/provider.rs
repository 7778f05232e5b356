//! Provider handle shared by every resource
//!
//! The host constructs one [`Provider`] per plugin instance and passes it to
//! each resource as the meta argument. It owns the API client, the
//! per-subscription lock table, and the wait timeouts.

use std::sync::Arc;
use std::time::Duration;

use rediscloud_api::{ClientConfig, CloudClient};
use tokio::sync::OwnedMutexGuard;

use crate::error::Result;
use crate::lock::PerIdLock;

/// Wait timeouts, user-configurable per resource
#[derive(Debug, Clone)]
pub struct ResourceTimeouts {
    /// Subscription creation (the slowest path: infrastructure provisioning)
    pub subscription_create: Duration,
    /// Subscription update and delete waits
    pub subscription_change: Duration,
    /// Database create/update/delete waits
    pub database: Duration,
    /// Peering and TGW attachment waits
    pub peering: Duration,
    /// PSC service and endpoint waits
    pub psc_create: Duration,
    /// Cloud-account creation
    pub cloud_account_create: Duration,
    /// Cloud-account activation after creation
    pub cloud_account_activate: Duration,
    /// Generic read-side waits
    pub read: Duration,
    /// Generic delete waits
    pub delete: Duration,
    /// Sleep before the first poll of a fresh mutation
    pub initial_delay: Duration,
    /// Sleep between poll attempts
    pub poll_interval: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            subscription_create: Duration::from_secs(30 * 60),
            subscription_change: Duration::from_secs(30 * 60),
            database: Duration::from_secs(30 * 60),
            peering: Duration::from_secs(10 * 60),
            psc_create: Duration::from_secs(30 * 60),
            cloud_account_create: Duration::from_secs(5 * 60),
            cloud_account_activate: Duration::from_secs(60),
            read: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
            initial_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Shared provider state: client, lock table, timeouts
pub struct Provider {
    client: CloudClient,
    locks: PerIdLock,
    timeouts: ResourceTimeouts,
}

impl Provider {
    /// Build a provider around an existing client
    #[must_use]
    pub fn new(client: CloudClient) -> Arc<Self> {
        Self::with_timeouts(client, ResourceTimeouts::default())
    }

    /// Build a provider with custom timeouts
    #[must_use]
    pub fn with_timeouts(client: CloudClient, timeouts: ResourceTimeouts) -> Arc<Self> {
        Arc::new(Self {
            client,
            locks: PerIdLock::new(),
            timeouts,
        })
    }

    /// Build a provider from `REDISCLOUD_*` environment variables
    pub fn from_env() -> Result<Arc<Self>> {
        let client = CloudClient::new(ClientConfig::from_env()?)?;
        Ok(Self::new(client))
    }

    /// The underlying API client
    #[must_use]
    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    /// Configured wait timeouts
    #[must_use]
    pub fn timeouts(&self) -> &ResourceTimeouts {
        &self.timeouts
    }

    /// Serialize a mutation against the given subscription.
    ///
    /// Held across the REST call and the wait that follows it; drops on
    /// scope exit, including cancellation.
    pub async fn lock_subscription(&self, subscription_id: i64) -> OwnedMutexGuard<()> {
        self.locks.lock(subscription_id).await
    }
}
