//! Per-record async locks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::RecordId;

type Slot = Arc<AsyncMutex<()>>;

/// Serializes remote writes that target the same `(resource, id)`.
///
/// Writes to different records never wait on each other. Slots nobody holds
/// or waits on are pruned on the next acquire.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one record.
    pub async fn acquire(&self, resource: &str, id: &RecordId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots
                .entry((resource.to_string(), id.as_str().to_string()))
                .or_default()
                .clone()
        };
        slot.lock_owned().await
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
