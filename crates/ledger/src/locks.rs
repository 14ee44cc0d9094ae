//! In-process per-entity serialization.
//!
//! Every unit of work that mutates a user's aggregates or a goal's amount
//! runs under the async mutex registered for that entity's storage key.
//! Different keys never contend, so cross-user and cross-goal operations
//! proceed fully in parallel; there is no global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum LockKey {
    User(String),
    Goal(String),
}

impl LockKey {
    pub(crate) fn user(id: &str) -> Self {
        Self::User(id.to_string())
    }

    pub(crate) fn goal(id: uuid::Uuid) -> Self {
        Self::Goal(id.to_string())
    }
}

/// Keyed registry of entity mutexes, created on demand.
///
/// The map holds one entry per user/goal this process has touched; entries
/// are tiny and bounded by the live entity population, so they are kept for
/// the lifetime of the engine.
#[derive(Debug, Default)]
pub(crate) struct EntityLocks {
    entries: Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl EntityLocks {
    /// Waits for exclusive access to `key` and returns the guard.
    pub(crate) async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key).or_default())
        };
        entry.lock_owned().await
    }
}
