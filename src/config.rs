//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chat_backend_mock::MOCK_BACKEND_ID;

pub const BACKEND_ENV_VAR: &str = "SCOUT_CHAT_BACKEND";
pub const BASE_URL_ENV_VAR: &str = "SCOUT_CHAT_BASE_URL";
pub const STREAM_PATH_ENV_VAR: &str = "SCOUT_CHAT_STREAM_PATH";
pub const COMPLETE_PATH_ENV_VAR: &str = "SCOUT_CHAT_COMPLETE_PATH";
pub const ACCESS_TOKEN_ENV_VAR: &str = "SCOUT_CHAT_ACCESS_TOKEN";
pub const TIMEOUT_ENV_VAR: &str = "SCOUT_CHAT_TIMEOUT_SEC";
pub const DATA_DIR_ENV_VAR: &str = "SCOUT_CHAT_DATA_DIR";
pub const LOG_ENV_VAR: &str = "SCOUT_CHAT_LOG";
pub const LOG_FILE_ENV_VAR: &str = "SCOUT_CHAT_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub backend_id: String,
    pub base_url: Option<String>,
    pub stream_path: Option<String>,
    pub complete_path: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Option<Duration>,
    /// Base directory; the store lives under `history_store::store_root` of it.
    pub data_dir: PathBuf,
    pub log_filter: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            backend_id: env_string_opt(BACKEND_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| MOCK_BACKEND_ID.to_string()),
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            stream_path: env_string_opt(STREAM_PATH_ENV_VAR),
            complete_path: env_string_opt(COMPLETE_PATH_ENV_VAR),
            access_token: env_string_opt(ACCESS_TOKEN_ENV_VAR),
            timeout: env_secs_opt(TIMEOUT_ENV_VAR),
            data_dir: env_string_opt(DATA_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            log_filter: env_string_opt(LOG_ENV_VAR),
            log_file: env_string_opt(LOG_FILE_ENV_VAR).map(PathBuf::from),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_secs_opt(key: &str) -> Option<Duration> {
    env_string_opt(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
