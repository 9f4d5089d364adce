//! Startup backend selection.

use std::sync::Arc;

use chat_api::url::DEFAULT_BASE_URL;
use chat_backend::{BackendInitError, ChatBackend};
use chat_backend_http::{HttpChatBackend, HttpChatBackendConfig, HTTP_BACKEND_ID};
use chat_backend_mock::{MockBackend, MOCK_BACKEND_ID};

use crate::config::EnvConfig;

pub const AVAILABLE_BACKENDS: [&str; 2] = [MOCK_BACKEND_ID, HTTP_BACKEND_ID];

pub fn backend_from_config(config: &EnvConfig) -> Result<Arc<dyn ChatBackend>, BackendInitError> {
    backend_for_id(&config.backend_id, config)
}

pub fn backend_for_id(
    backend_id: &str,
    config: &EnvConfig,
) -> Result<Arc<dyn ChatBackend>, BackendInitError> {
    match backend_id {
        MOCK_BACKEND_ID => Ok(Arc::new(MockBackend::interactive())),
        HTTP_BACKEND_ID => Ok(Arc::new(HttpChatBackend::new(http_config(config))?)),
        unknown => Err(BackendInitError::new(format!(
            "Unsupported backend '{unknown}'. Available backends: {}",
            AVAILABLE_BACKENDS.join(", ")
        ))),
    }
}

fn http_config(config: &EnvConfig) -> HttpChatBackendConfig {
    let mut http = HttpChatBackendConfig::new(
        config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
    );

    if let Some(token) = &config.access_token {
        http = http.with_access_token(token.clone());
    }
    if let Some(path) = &config.stream_path {
        http = http.with_stream_path(path.clone());
    }
    if let Some(path) = &config.complete_path {
        http = http.with_complete_path(path.clone());
    }
    if let Some(timeout) = config.timeout {
        http = http.with_timeout(timeout);
    }

    http
}
