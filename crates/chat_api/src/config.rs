use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::{DEFAULT_BASE_URL, DEFAULT_COMPLETE_PATH, DEFAULT_STREAM_PATH};

/// Transport configuration for chat service requests.
#[derive(Debug, Clone)]
pub struct ChatApiConfig {
    /// Base URL both endpoints are joined onto.
    pub base_url: String,
    /// Path of the token-streaming endpoint.
    pub stream_path: String,
    /// Path of the single-response endpoint used as fallback.
    pub complete_path: String,
    /// Optional bearer token passed to `Authorization`.
    pub access_token: Option<String>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            complete_path: DEFAULT_COMPLETE_PATH.to_string(),
            access_token: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl ChatApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn with_complete_path(mut self, path: impl Into<String>) -> Self {
        self.complete_path = path.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
