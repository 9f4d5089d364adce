//! HTTP implementation of the shared `chat_backend` contract.
//!
//! This adapter translates `chat_api` transport results into
//! provider-neutral payloads, token streams and `BackendError` kinds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_api::{ChatApiClient, ChatApiConfig, ChatApiError, ChatRequest, ChatRequestMessage};
use chat_backend::{
    BackendError, BackendErrorKind, BackendInitError, BackendProfile, ChatBackend, ChatPayload,
    TokenStream,
};
use futures_util::stream::StreamExt;
use tracing::debug;

/// Stable backend identifier used for startup selection.
pub const HTTP_BACKEND_ID: &str = "http";

/// Runtime configuration for the HTTP backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpChatBackendConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub stream_path: Option<String>,
    pub complete_path: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpChatBackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            stream_path: None,
            complete_path: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    #[must_use]
    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_complete_path(mut self, path: impl Into<String>) -> Self {
        self.complete_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(self.base_url);

        if let Some(token) = self.access_token {
            config = config.with_access_token(token);
        }

        if let Some(path) = self.stream_path {
            config = config.with_stream_path(path);
        }

        if let Some(path) = self.complete_path {
            config = config.with_complete_path(path);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

#[async_trait]
trait Transport: Send + Sync {
    fn stream_endpoint(&self) -> String;

    async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<chat_api::TokenStream, ChatApiError>;

    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatApiError>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: ChatApiClient,
}

#[async_trait]
impl Transport for DefaultTransport {
    fn stream_endpoint(&self) -> String {
        self.client.stream_endpoint()
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<chat_api::TokenStream, ChatApiError> {
        self.client.open_stream(request).await
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatApiError> {
        self.client.complete(request).await
    }
}

/// `ChatBackend` adapter backed by `chat_api` transport primitives.
pub struct HttpChatBackend {
    transport: Arc<dyn Transport>,
}

impl HttpChatBackend {
    /// Creates a backend using real HTTP transport.
    pub fn new(config: HttpChatBackendConfig) -> Result<Self, BackendInitError> {
        if config.base_url.trim().is_empty() {
            return Err(BackendInitError::new(
                "Failed to initialize http backend: base URL is empty",
            ));
        }

        let client = ChatApiClient::new(config.into_chat_api_config()).map_err(map_init_error)?;
        Ok(Self {
            transport: Arc::new(DefaultTransport { client }),
        })
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: HTTP_BACKEND_ID.to_string(),
            endpoint: Some(self.transport.stream_endpoint()),
        }
    }

    async fn open_stream(&self, payload: &ChatPayload) -> Result<TokenStream, BackendError> {
        let request = to_chat_request(payload);
        let tokens = self
            .transport
            .open_stream(&request)
            .await
            .map_err(map_api_error)?;

        Ok(tokens
            .map(|item| item.map_err(map_api_error))
            .boxed())
    }

    async fn complete(&self, payload: &ChatPayload) -> Result<String, BackendError> {
        let request = to_chat_request(payload);
        let reply = self
            .transport
            .complete(&request)
            .await
            .map_err(map_api_error)?;
        debug!(chars = reply.len(), "fallback reply received");
        Ok(reply)
    }
}

fn to_chat_request(payload: &ChatPayload) -> ChatRequest {
    let messages = payload
        .messages
        .iter()
        .map(|turn| ChatRequestMessage::new(turn.role.as_str(), turn.content.clone()))
        .collect();
    ChatRequest::new(messages, payload.strategy.clone())
}

fn map_api_error(error: ChatApiError) -> BackendError {
    match error {
        ChatApiError::Status(status, message) => BackendError::status(status.as_u16(), message),
        ChatApiError::Timeout(_) => BackendError::new(BackendErrorKind::Timeout, error.to_string()),
        ChatApiError::Request(_) => BackendError::transport(error.to_string()),
        ChatApiError::EmptyBody => {
            BackendError::new(BackendErrorKind::EmptyBody, error.to_string())
        }
        ChatApiError::MalformedResponse(_) | ChatApiError::Serde(_) => {
            BackendError::new(BackendErrorKind::Malformed, error.to_string())
        }
        ChatApiError::InvalidBaseUrl(_)
        | ChatApiError::InvalidHeader(_)
        | ChatApiError::InvalidRequestPayload(_) => {
            BackendError::new(BackendErrorKind::Other, error.to_string())
        }
    }
}

fn map_init_error(error: ChatApiError) -> BackendInitError {
    BackendInitError::new(format!("Failed to initialize http backend: {error}"))
}
