//! Send pipeline: user message, streamed reply, single fallback.
//!
//! A send walks `Idle -> SendingUser -> Streaming`, then either settles on
//! `StreamOk` or moves through `StreamFailed -> FallbackSending` to
//! `FallbackOk` or `FallbackFailed`, and always returns to `Idle`. Only one
//! send runs at a time; a second `send` while busy is rejected without
//! touching the conversation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use chat_backend::{BackendError, BackendProfile, ChatBackend, ChatPayload, ChatTurn};
use futures_util::StreamExt;
use history_store::KeyValueStore;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::conversation::ConversationState;
use crate::counter::CounterService;
use crate::message::{Message, MessageId, NewMessage};
use crate::persistence::PersistenceSynchronizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SendingUser,
    Streaming,
    StreamOk,
    StreamFailed,
    FallbackSending,
    FallbackOk,
    FallbackFailed,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SendingUser => "sending_user",
            Self::Streaming => "streaming",
            Self::StreamOk => "stream_ok",
            Self::StreamFailed => "stream_failed",
            Self::FallbackSending => "fallback_sending",
            Self::FallbackOk => "fallback_ok",
            Self::FallbackFailed => "fallback_failed",
        }
    }
}

/// Notification for rendering surfaces. `send` remains the source of truth
/// for how a call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended(Message),
    ContentUpdated { id: MessageId, content: String },
    PhaseChanged(Phase),
}

/// How a successful `send` settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was appended.
    Ignored,
    /// The stream completed; the placeholder holds the reply.
    Streamed {
        message_id: MessageId,
        content: String,
    },
    /// The stream failed and the fallback reply was appended as a new message.
    RecoveredByFallback {
        placeholder_id: MessageId,
        message_id: MessageId,
        content: String,
        stream_error: BackendError,
    },
}

/// Failure of an orchestrator operation. `Busy` applies to `send`, `clear`
/// and `hydrate`; `Fallback` only to `send`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("a reply is still in progress")]
    Busy,

    #[error("streaming failed ({stream_error}) and the fallback request failed: {fallback_error}")]
    Fallback {
        stream_error: BackendError,
        fallback_error: BackendError,
    },
}

pub struct ChatOrchestrator {
    backend: Arc<dyn ChatBackend>,
    persistence: PersistenceSynchronizer,
    conversation: Mutex<ConversationState>,
    strategy: StdMutex<String>,
    phase: StdMutex<Phase>,
    busy: AtomicBool,
    subscribers: StdMutex<Vec<mpsc::UnboundedSender<ChatEvent>>>,
    send_counter: Option<Arc<CounterService>>,
}

/// Clears the busy flag and returns to `Idle`, including when a send future
/// is dropped mid-flight.
struct BusyGuard<'a> {
    orchestrator: &'a ChatOrchestrator,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.orchestrator.phase() != Phase::Idle {
            self.orchestrator.set_phase(Phase::Idle);
        }
        self.orchestrator.busy.store(false, Ordering::Release);
    }
}

impl ChatOrchestrator {
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        let persistence = PersistenceSynchronizer::new(store);
        Self {
            backend,
            conversation: Mutex::new(ConversationState::new(persistence.clone())),
            persistence,
            strategy: StdMutex::new(String::new()),
            phase: StdMutex::new(Phase::Idle),
            busy: AtomicBool::new(false),
            subscribers: StdMutex::new(Vec::new()),
            send_counter: None,
        }
    }

    /// Counts every send that settles successfully.
    #[must_use]
    pub fn with_send_counter(mut self, counter: Arc<CounterService>) -> Self {
        self.send_counter = Some(counter);
        self
    }

    #[must_use]
    pub fn backend_profile(&self) -> BackendProfile {
        self.backend.profile()
    }

    /// Loads stored history and strategy. Returns the number of messages.
    pub async fn hydrate(&self) -> Result<usize, ChatError> {
        let _busy = self.begin()?;

        let count = {
            let mut conversation = self.conversation.lock().await;
            conversation.load().await;
            conversation.len()
        };
        let strategy = self.persistence.load_strategy().await;
        *lock_unpoisoned(&self.strategy) = strategy;

        info!(messages = count, "conversation hydrated");
        Ok(count)
    }

    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        if text.trim().is_empty() {
            debug!("ignoring blank input");
            return Ok(SendOutcome::Ignored);
        }

        let _busy = self.begin()?;
        self.set_phase(Phase::SendingUser);
        info!(chars = text.len(), "sending chat message");

        self.append(NewMessage::user(text)).await;
        let payload = self.build_payload().await;
        let placeholder_id = self.append(NewMessage::assistant("")).await;

        self.set_phase(Phase::Streaming);
        let stream_error = match self.stream_into(&placeholder_id, &payload).await {
            Ok(content) => {
                self.set_phase(Phase::StreamOk);
                info!(chars = content.len(), "reply streamed");
                self.count_success().await;
                return Ok(SendOutcome::Streamed {
                    message_id: placeholder_id,
                    content,
                });
            }
            Err(error) => error,
        };

        warn!(error = %stream_error, "stream failed, falling back to single response");
        self.set_phase(Phase::StreamFailed);
        self.set_phase(Phase::FallbackSending);

        match self.backend.complete(&payload).await {
            Ok(content) => {
                let message_id = self
                    .append(NewMessage::assistant(content.clone()))
                    .await;
                self.set_phase(Phase::FallbackOk);
                info!(chars = content.len(), "reply recovered by fallback");
                self.count_success().await;
                Ok(SendOutcome::RecoveredByFallback {
                    placeholder_id,
                    message_id,
                    content,
                    stream_error,
                })
            }
            Err(fallback_error) => {
                self.set_phase(Phase::FallbackFailed);
                error!(error = %fallback_error, "fallback request failed");
                Err(ChatError::Fallback {
                    stream_error,
                    fallback_error,
                })
            }
        }
    }

    /// Clears the conversation and its stored copy. Rejected while busy.
    pub async fn clear(&self) -> Result<(), ChatError> {
        let _busy = self.begin()?;
        self.conversation.lock().await.clear().await;
        info!("conversation cleared");
        Ok(())
    }

    pub async fn set_strategy(&self, text: &str) {
        *lock_unpoisoned(&self.strategy) = text.to_string();
        if let Err(error) = self.persistence.save_strategy(text).await {
            error!(%error, "failed to persist strategy");
        }
    }

    #[must_use]
    pub fn strategy(&self) -> String {
        lock_unpoisoned(&self.strategy).clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        *lock_unpoisoned(&self.phase)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.conversation.lock().await.snapshot().to_vec()
    }

    /// Registers a new event receiver. Dropped receivers are pruned on the
    /// next event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        lock_unpoisoned(&self.subscribers).push(sender);
        receiver
    }

    fn begin(&self) -> Result<BusyGuard<'_>, ChatError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatError::Busy)?;
        Ok(BusyGuard { orchestrator: self })
    }

    async fn stream_into(
        &self,
        placeholder_id: &str,
        payload: &ChatPayload,
    ) -> Result<String, BackendError> {
        let mut tokens = self.backend.open_stream(payload).await?;
        let mut accumulated = String::new();

        while let Some(token) = tokens.next().await {
            accumulated.push_str(&token?);
            self.apply_content(placeholder_id, &accumulated).await;
        }

        Ok(accumulated)
    }

    async fn append(&self, message: NewMessage) -> MessageId {
        let message = self.conversation.lock().await.append_message(message).await;
        let id = message.id.clone();
        self.emit(ChatEvent::MessageAppended(message));
        id
    }

    async fn apply_content(&self, id: &str, content: &str) {
        let changed = self
            .conversation
            .lock()
            .await
            .update_content_by_id(id, content)
            .await;
        if changed {
            debug!(%id, chars = content.len(), "token applied");
            self.emit(ChatEvent::ContentUpdated {
                id: id.to_string(),
                content: content.to_string(),
            });
        }
    }

    async fn build_payload(&self) -> ChatPayload {
        let turns = self
            .conversation
            .lock()
            .await
            .snapshot()
            .iter()
            .map(|message| ChatTurn::new(message.role, message.content.clone()))
            .collect();
        ChatPayload::new(turns, self.strategy())
    }

    async fn count_success(&self) {
        if let Some(counter) = &self.send_counter {
            let total = counter.increment().await;
            debug!(total, "successful send counted");
        }
    }

    fn set_phase(&self, phase: Phase) {
        *lock_unpoisoned(&self.phase) = phase;
        debug!(phase = phase.as_str(), "phase changed");
        self.emit(ChatEvent::PhaseChanged(phase));
    }

    fn emit(&self, event: ChatEvent) {
        lock_unpoisoned(&self.subscribers).retain(|sender| sender.send(event.clone()).is_ok());
    }
}

fn lock_unpoisoned<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
