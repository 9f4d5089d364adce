//! Deterministic mock implementation of the shared `chat_backend` contract.
//!
//! This crate contains no transport logic. Stream and fallback outcomes are
//! scripted per call, which makes it the workhorse of the orchestrator tests
//! and the default backend for local runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chat_backend::{BackendError, BackendProfile, ChatBackend, ChatPayload, TokenStream};
use futures_util::stream::{self, StreamExt};
use tokio::sync::Notify;
use tokio::time::sleep;

/// Stable backend identifier used for explicit startup selection.
pub const MOCK_BACKEND_ID: &str = "mock";

const CANNED_REPLY: &str = "Based on your strategy, here are three profiles worth a closer look:\n\
1. A left back comfortable inverting into midfield.\n\
2. A ball-winning eight who presses high.\n\
3. A young striker with strong off-ball movement.\n";

/// Outcome of one streaming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamScript {
    /// Deliver every token, then close cleanly.
    Tokens(Vec<String>),
    /// Reject the call before any token is produced.
    FailBeforeTokens(BackendError),
    /// Deliver `tokens`, then end the stream with `error`.
    FailAfter {
        tokens: Vec<String>,
        error: BackendError,
    },
}

impl StreamScript {
    #[must_use]
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tokens(tokens.into_iter().map(Into::into).collect())
    }
}

/// Outcome of one single-response call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackScript {
    Reply(String),
    Fail(BackendError),
}

/// Which endpoint a recorded call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Stream,
    Complete,
}

/// One call observed by the mock, with the payload exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCall {
    pub kind: CallKind,
    pub payload: ChatPayload,
}

/// Scripted backend. Once a script queue runs dry the canned reply is used.
#[derive(Debug, Default)]
pub struct MockBackend {
    stream_scripts: Mutex<VecDeque<StreamScript>>,
    fallback_scripts: Mutex<VecDeque<FallbackScript>>,
    observed: Mutex<Vec<ObservedCall>>,
    release_gate: Option<Arc<Notify>>,
    token_delay: Duration,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend used by the interactive binary: canned reply, paced tokens.
    #[must_use]
    pub fn interactive() -> Self {
        Self::new().with_token_delay(Duration::from_millis(Self::TOKEN_DELAY_MS))
    }

    #[must_use]
    pub fn with_stream_script(self, script: StreamScript) -> Self {
        self.push_stream_script(script);
        self
    }

    #[must_use]
    pub fn with_fallback_script(self, script: FallbackScript) -> Self {
        self.push_fallback_script(script);
        self
    }

    /// Holds every stream before its first token until `gate` is notified.
    #[must_use]
    pub fn with_release_gate(mut self, gate: Arc<Notify>) -> Self {
        self.release_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// Queues a stream outcome on a backend that is already shared.
    pub fn push_stream_script(&self, script: StreamScript) {
        lock_unpoisoned(&self.stream_scripts).push_back(script);
    }

    pub fn push_fallback_script(&self, script: FallbackScript) {
        lock_unpoisoned(&self.fallback_scripts).push_back(script);
    }

    #[must_use]
    pub fn observed_calls(&self) -> Vec<ObservedCall> {
        lock_unpoisoned(&self.observed).clone()
    }

    #[must_use]
    pub fn calls_of(&self, kind: CallKind) -> Vec<ChatPayload> {
        lock_unpoisoned(&self.observed)
            .iter()
            .filter(|call| call.kind == kind)
            .map(|call| call.payload.clone())
            .collect()
    }

    fn record(&self, kind: CallKind, payload: &ChatPayload) {
        lock_unpoisoned(&self.observed).push(ObservedCall {
            kind,
            payload: payload.clone(),
        });
    }

    const TOKEN_DELAY_MS: u64 = 30;
}

struct ScriptedTokens {
    gate: Option<Arc<Notify>>,
    items: VecDeque<Result<String, BackendError>>,
    delay: Duration,
    started: bool,
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: MOCK_BACKEND_ID.to_string(),
            endpoint: None,
        }
    }

    async fn open_stream(&self, payload: &ChatPayload) -> Result<TokenStream, BackendError> {
        self.record(CallKind::Stream, payload);

        let script = lock_unpoisoned(&self.stream_scripts)
            .pop_front()
            .unwrap_or_else(|| StreamScript::Tokens(split_tokens(CANNED_REPLY)));

        let (tokens, error) = match script {
            StreamScript::FailBeforeTokens(error) => return Err(error),
            StreamScript::Tokens(tokens) => (tokens, None),
            StreamScript::FailAfter { tokens, error } => (tokens, Some(error)),
        };

        let state = ScriptedTokens {
            gate: self.release_gate.clone(),
            items: tokens.into_iter().map(Ok).chain(error.map(Err)).collect(),
            delay: self.token_delay,
            started: false,
        };

        let tokens = stream::unfold(state, |mut state| async move {
            if !state.started {
                state.started = true;
                if let Some(gate) = state.gate.take() {
                    gate.notified().await;
                }
            } else if !state.delay.is_zero() {
                sleep(state.delay).await;
            }

            let item = state.items.pop_front()?;
            Some((item, state))
        });

        Ok(tokens.boxed())
    }

    async fn complete(&self, payload: &ChatPayload) -> Result<String, BackendError> {
        self.record(CallKind::Complete, payload);

        match lock_unpoisoned(&self.fallback_scripts).pop_front() {
            Some(FallbackScript::Reply(reply)) => Ok(reply),
            Some(FallbackScript::Fail(error)) => Err(error),
            None => Ok(CANNED_REPLY.to_string()),
        }
    }
}

/// Splits text into word-sized tokens, keeping the trailing space or newline.
#[must_use]
pub fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for ch in text.chars() {
        pending.push(ch);
        if matches!(ch, ' ' | '\n') {
            tokens.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }

    tokens
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
