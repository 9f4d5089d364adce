//! Backend-agnostic contract for the scouting chat service.
//!
//! This crate defines only the request payload, error taxonomy and the async
//! backend trait. It excludes HTTP transport details and conversation state.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Full request body for both the streaming and the single-response call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    pub messages: Vec<ChatTurn>,
    pub strategy: Option<String>,
}

impl ChatPayload {
    /// Builds a payload; a blank strategy is dropped.
    #[must_use]
    pub fn new(messages: Vec<ChatTurn>, strategy: impl Into<String>) -> Self {
        let strategy = strategy.into();
        Self {
            messages,
            strategy: (!strategy.trim().is_empty()).then_some(strategy),
        }
    }
}

/// Immutable metadata describing a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend_id: String,
    pub endpoint: Option<String>,
}

/// Error returned while constructing a backend before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInitError {
    message: String,
}

impl BackendInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendInitError {}

impl From<String> for BackendInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BackendInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Coarse classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Transport,
    Status(u16),
    Timeout,
    EmptyBody,
    Malformed,
    Other,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Timeout => f.write_str("timeout"),
            Self::EmptyBody => f.write_str("empty body"),
            Self::Malformed => f.write_str("malformed response"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// Failure of a single streaming or completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    kind: BackendErrorKind,
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    #[must_use]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Status(code), message)
    }

    #[must_use]
    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendError {}

/// Tokens of one streaming session in delivery order.
///
/// An `Err` item terminates the session; implementations do not yield after it.
pub type TokenStream = BoxStream<'static, Result<String, BackendError>>;

/// Backend interface for one chat round trip.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Returns backend identity metadata.
    fn profile(&self) -> BackendProfile;

    /// Opens the streaming call for `payload`.
    ///
    /// Failures that happen before any token (non-2xx, connect errors) are
    /// returned directly; later failures arrive as the last stream item.
    async fn open_stream(&self, payload: &ChatPayload) -> Result<TokenStream, BackendError>;

    /// Sends `payload` to the single-response endpoint and returns the reply.
    async fn complete(&self, payload: &ChatPayload) -> Result<String, BackendError>;
}
