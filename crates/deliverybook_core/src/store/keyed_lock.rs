//! Per-key async mutual exclusion.
//!
//! Tokio mutexes queue waiters fairly, so operations on one contact id run
//! in the order they were submitted while other ids proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    /// Waits for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots referenced only by the map are idle and can be dropped.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key.to_owned()).or_default())
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::KeyedLocks;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_waits_and_other_keys_do_not() {
        let locks = Arc::new(KeyedLocks::default());
        let held = locks.lock("1").await;

        let other = tokio::time::timeout(Duration::from_millis(200), locks.lock("2")).await;
        assert!(other.is_ok(), "a different key must not block");

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock("1")).await;
        assert!(same.is_err(), "the same key must wait for the holder");

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(200), locks.lock("1")).await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = KeyedLocks::default();
        drop(locks.lock("a").await);
        drop(locks.lock("b").await);
        let _held = locks.lock("c").await;
        assert_eq!(locks.tracked_keys(), 1);
    }
}
