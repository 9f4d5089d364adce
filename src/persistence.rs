//! Serialization of conversation state onto a [`KeyValueStore`].

use std::sync::Arc;

use history_store::{KeyValueStore, StoreError, HISTORY_KEY, STRATEGY_KEY};
use thiserror::Error;
use tracing::warn;

use crate::message::Message;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and writes the history and strategy keys.
///
/// Loads never fail: a missing key or unparsable value reads as empty.
#[derive(Clone)]
pub struct PersistenceSynchronizer {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceSynchronizer {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn save_history(&self, messages: &[Message]) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_string(messages)?;
        self.store.set(HISTORY_KEY, &serialized).await?;
        Ok(())
    }

    pub async fn load_history(&self) -> Vec<Message> {
        let raw = match self.store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(%error, "failed to read stored history");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => messages,
            Err(error) => {
                warn!(%error, "stored history is not valid, starting empty");
                Vec::new()
            }
        }
    }

    pub async fn clear_history(&self) -> Result<(), PersistenceError> {
        self.store.remove(HISTORY_KEY).await?;
        Ok(())
    }

    pub async fn save_strategy(&self, text: &str) -> Result<(), PersistenceError> {
        self.store.set(STRATEGY_KEY, text).await?;
        Ok(())
    }

    pub async fn load_strategy(&self) -> String {
        match self.store.get(STRATEGY_KEY).await {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                warn!(%error, "failed to read stored strategy");
                String::new()
            }
        }
    }
}
