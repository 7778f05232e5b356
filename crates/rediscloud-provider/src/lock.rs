//! Per-subscription serialization lock
//!
//! The management API allows one in-flight mutation per subscription and
//! answers 409 to the rest. When the host applies several resources of one
//! subscription in parallel, this keyed mutex coalesces them so the 409 path
//! is never hit from inside this process.
//!
//! Entries are never removed: the key space is bounded by the subscriptions
//! a process touches, and an inner mutex must not be dropped while a guard
//! may still reference it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed mutex granting at-most-one holder per subscription id
#[derive(Default)]
pub struct PerIdLock {
    inner: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl PerIdLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `id`, waiting if another caller holds it.
    ///
    /// The outer map mutex is held only for the fetch-or-insert, never while
    /// blocking on the inner lock. The guard releases on drop, including when
    /// the owning future is cancelled. Not re-entrant: a caller holding the
    /// guard for `id` must not lock `id` again.
    pub async fn lock(&self, id: i64) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            Arc::clone(map.entry(id).or_default())
        };
        entry.lock_owned().await
    }
}
