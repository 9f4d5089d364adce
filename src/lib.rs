//! Client core of a player-scouting chat assistant.
//!
//! Invariant: the conversation log is mutated only by [`ChatOrchestrator`], and
//! every mutation is mirrored to the store.
//!
//! # Public API Overview
//! - Drive a chat with [`ChatOrchestrator::send`]; a failed token stream is
//!   retried once against the single-response endpoint.
//! - Inspect or clear the log via [`ConversationState`] snapshots and
//!   [`ChatOrchestrator::clear`].
//! - Persist history, strategy and counters through any
//!   [`history_store::KeyValueStore`].
//! - Pick a backend at startup with [`backends::backend_from_config`].

pub mod backends;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod counter;
pub mod logging;
pub mod message;
pub mod orchestrator;
pub mod persistence;

pub use crate::config::EnvConfig;
pub use crate::conversation::ConversationState;
pub use crate::counter::{CounterService, SEND_COUNTER};
pub use crate::message::{Message, MessageId, NewMessage};
pub use crate::orchestrator::{ChatError, ChatEvent, ChatOrchestrator, Phase, SendOutcome};
pub use crate::persistence::{PersistenceError, PersistenceSynchronizer};

pub use chat_backend::Role;
