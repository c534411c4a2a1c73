//! Optional per-city refresh serialization.
//!
//! Without it, two concurrent requests that both see a stale record will both
//! refresh and both append an observation; the next read just picks the most
//! recent one. With it, refreshes for the same city queue behind one lock and
//! re-check the store before fetching.

use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Default)]
pub struct RefreshLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RefreshLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock shared by every caller refreshing `city`.
    pub fn lock_for(&self, city: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        // Drop entries nobody is holding or waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(city.to_owned()).or_default().clone()
    }

    /// Number of cities with a refresh in flight or queued.
    pub fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_city_shares_a_lock() {
        let locks = RefreshLocks::new();
        let a = locks.lock_for("Antalya");
        let b = locks.lock_for("Antalya");
        let c = locks.lock_for("Izmir");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.in_flight(), 2);
    }

    #[test]
    fn idle_entries_are_pruned() {
        let locks = RefreshLocks::new();
        drop(locks.lock_for("Antalya"));
        let _izmir = locks.lock_for("Izmir");

        assert_eq!(locks.locks.lock().len(), 1);
        assert_eq!(locks.in_flight(), 1);
    }
}
