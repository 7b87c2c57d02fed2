//! Per-identifier serialization of attempt-state updates.
//!
//! Two attempts against the same identifier must not interleave between the
//! store read and the store write, or failures get lost. Each identifier gets
//! an async mutex for the duration of one evaluation; entries are dropped as
//! soon as nobody holds or waits on them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// One identifier's mutex plus the number of holders and waiters.
#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

#[derive(Debug, Default)]
pub struct KeyedLocks {
    entries: Slots,
}

/// Held for the lifetime of one evaluation.
///
/// The guard is registered before waiting on the mutex, so a caller that is
/// cancelled mid-wait still releases its slot.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    entries: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = entries.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };

        let mut key_guard = KeyGuard {
            key: key.to_string(),
            entries: Arc::clone(&self.entries),
            guard: None,
        };
        key_guard.guard = Some(mutex.lock_owned().await);

        key_guard
    }

    /// Number of identifiers currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = entries.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                entries.remove(&self.key);
            }
        }
    }
}
