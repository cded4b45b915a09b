//! Per-entity mutation serialization.
//!
//! At most one optimistic mutation per entity id is in flight. A second
//! mutation on the same id waits for the first to settle and then snapshots
//! the settled state. Different ids never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tradedesk_core::EntityId;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Default, Clone)]
pub struct InflightLocks {
    slots: Arc<Mutex<HashMap<EntityId, Slot>>>,
}

impl InflightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other mutation holds `id`, then hold it until the
    /// returned guard drops.
    pub async fn acquire(&self, id: &EntityId) -> InflightGuard {
        let slot = {
            let mut slots = self.lock_slots();
            Arc::clone(slots.entry(id.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        InflightGuard {
            id: id.clone(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of ids with a held or awaited lock.
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<EntityId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct InflightGuard {
    id: EntityId,
    slots: Arc<Mutex<HashMap<EntityId, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Map entry plus our guard: nobody else is waiting, drop the slot.
        let idle = slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2);
        if idle {
            slots.remove(&self.id);
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_waits_for_release() {
        let locks = InflightLocks::new();
        let id = EntityId::from("1");

        let first = locks.acquire(&id).await;
        let waiting = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&id)).await;
        assert!(waiting.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(200), locks.acquire(&id)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = InflightLocks::new();
        let _a = locks.acquire(&EntityId::from("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&EntityId::from("b"))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_slots_are_removed() {
        let locks = InflightLocks::new();
        let guard = locks.acquire(&EntityId::from("1")).await;
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }
}
