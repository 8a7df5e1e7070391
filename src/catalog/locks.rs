use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::DocId;

type Slot = Arc<AsyncMutex<()>>;

/// In-process mutual exclusion keyed by aggregate id. Holders of the same id
/// run one at a time; different ids never contend. Entries are dropped once
/// nobody holds or waits on them.
#[derive(Clone, Default)]
pub struct AggregateLocks {
    slots: Arc<Mutex<HashMap<DocId, Slot>>>,
}

pub struct AggregateGuard {
    id: DocId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Mutex<HashMap<DocId, Slot>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: DocId) -> AggregateGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(id).or_default())
        };

        let guard = slot.lock_owned().await;
        AggregateGuard {
            id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for AggregateGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: no holder, no waiter
        if slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = AggregateLocks::new();
        let id = DocId::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(id).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = AggregateLocks::new();
        let _a = locks.lock(DocId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(DocId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_slots_are_forgotten() {
        let locks = AggregateLocks::new();
        {
            let _guard = locks.lock(DocId::new()).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
