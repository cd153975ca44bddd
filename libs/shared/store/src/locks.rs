use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per slot id. Holding a slot's guard across a
/// check-then-write sequence serializes it against every other writer
/// targeting the same slot, which is the only cross-request coordination
/// the scheduling core needs.
#[derive(Default)]
pub struct SlotLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, slot_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(slot_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the slot's entry once the slot itself is gone. Anyone still
    /// holding a guard keeps the old mutex alive until they release it.
    pub async fn release(&self, slot_id: Uuid) {
        self.inner.lock().await.remove(&slot_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guards_for_the_same_slot_are_exclusive() {
        let locks = Arc::new(SlotLocks::new());
        let slot_id = Uuid::new_v4();

        let guard = locks.acquire(slot_id).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(slot_id).await;
            })
        };

        // The second acquire cannot finish while the first guard is held.
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn guards_for_different_slots_do_not_contend() {
        let locks = SlotLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = locks.acquire(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn released_slots_leave_no_entry_behind() {
        let locks = SlotLocks::new();

        for _ in 0..100 {
            let slot_id = Uuid::new_v4();
            drop(locks.acquire(slot_id).await);
            locks.release(slot_id).await;
        }

        assert_eq!(locks.len().await, 0);
    }
}
