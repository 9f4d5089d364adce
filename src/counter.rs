//! Persisted named counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use history_store::{counter_key, KeyValueStore};
use tracing::{error, warn};

/// Counter of successfully settled sends.
pub const SEND_COUNTER: &str = "sends";

/// A single persisted counter, read once at start and written on change.
pub struct CounterService {
    store: Arc<dyn KeyValueStore>,
    key: String,
    value: AtomicU64,
}

impl CounterService {
    /// Loads `name` from the store. Missing or corrupt values start at 0.
    pub async fn load(store: Arc<dyn KeyValueStore>, name: &str) -> Self {
        let key = counter_key(name);
        let value = match store.get(&key).await {
            Ok(Some(raw)) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!(%key, value = %raw, "counter value is not a number, starting at 0");
                0
            }),
            Ok(None) => 0,
            Err(error) => {
                warn!(%key, %error, "failed to read counter, starting at 0");
                0
            }
        };

        Self {
            store,
            key,
            value: AtomicU64::new(value),
        }
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Adds one, persists, and returns the new value.
    pub async fn increment(&self) -> u64 {
        let next = self.value.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        self.persist(next).await;
        next
    }

    pub async fn reset(&self) {
        self.value.store(0, Ordering::Release);
        self.persist(0).await;
    }

    async fn persist(&self, value: u64) {
        if let Err(error) = self.store.set(&self.key, &value.to_string()).await {
            error!(key = %self.key, %error, "failed to persist counter");
        }
    }
}

#[cfg(test)]
mod tests {
    use history_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn increments_persist_and_survive_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let counter = CounterService::load(Arc::clone(&store), SEND_COUNTER).await;
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment().await, 1);
        assert_eq!(counter.increment().await, 2);

        let reloaded = CounterService::load(Arc::clone(&store), SEND_COUNTER).await;
        assert_eq!(reloaded.get(), 2);
        assert_eq!(
            store.get("counter.sends").await.expect("get"),
            Some("2".to_string())
        );
    }

    #[tokio::test]
    async fn corrupt_value_loads_as_zero_and_reset_persists() {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(MemoryStore::new().with_value("counter.sends", "many"));

        let counter = CounterService::load(Arc::clone(&store), SEND_COUNTER).await;
        assert_eq!(counter.get(), 0);

        counter.increment().await;
        counter.reset().await;
        assert_eq!(counter.get(), 0);
        assert_eq!(
            store.get("counter.sends").await.expect("get"),
            Some("0".to_string())
        );
    }
}
