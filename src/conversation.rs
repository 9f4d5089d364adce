//! In-memory ordered message log mirrored to the store after every mutation.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::message::{Message, MessageId, NewMessage};
use crate::persistence::PersistenceSynchronizer;

pub struct ConversationState {
    messages: Vec<Message>,
    persistence: PersistenceSynchronizer,
}

impl ConversationState {
    /// Creates an empty log; call [`Self::load`] to hydrate from the store.
    #[must_use]
    pub fn new(persistence: PersistenceSynchronizer) -> Self {
        Self {
            messages: Vec::new(),
            persistence,
        }
    }

    /// Appends at the tail and persists. Store failures are logged.
    pub async fn append(&mut self, message: NewMessage) -> MessageId {
        self.append_message(message).await.id
    }

    /// Same as [`Self::append`], returning a copy of the stored message.
    pub async fn append_message(&mut self, message: NewMessage) -> Message {
        let message = Message::new(message.role, message.content);
        debug!(id = %message.id, role = %message.role, "message appended");
        self.messages.push(message.clone());
        self.persist().await;
        message
    }

    /// Replaces the content of `id` in place.
    ///
    /// Returns whether a message changed. An unknown id is a silent no-op.
    pub async fn update_content_by_id(&mut self, id: &str, content: &str) -> bool {
        let Some(message) = self.messages.iter_mut().find(|message| message.id == id) else {
            return false;
        };
        if message.content == content {
            return false;
        }

        message.content.clear();
        message.content.push_str(content);
        self.persist().await;
        true
    }

    /// Replaces the log with the stored history.
    ///
    /// Later duplicates of an already-seen id are dropped.
    pub async fn load(&mut self) {
        let stored = self.persistence.load_history().await;
        let mut seen = HashSet::with_capacity(stored.len());
        let mut messages = Vec::with_capacity(stored.len());

        for message in stored {
            if seen.insert(message.id.clone()) {
                messages.push(message);
            } else {
                warn!(id = %message.id, "dropping duplicate stored message id");
            }
        }

        debug!(count = messages.len(), "history loaded");
        self.messages = messages;
    }

    /// Empties the log and removes the stored copy.
    pub async fn clear(&mut self) {
        self.messages.clear();
        if let Err(error) = self.persistence.clear_history().await {
            error!(%error, "failed to remove stored history");
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    async fn persist(&self) {
        if let Err(error) = self.persistence.save_history(&self.messages).await {
            error!(%error, "failed to persist history");
        }
    }
}
