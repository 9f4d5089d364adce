use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};

#[derive(Debug)]
pub enum ChatApiError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    InvalidRequestPayload(String),
    Request(reqwest::Error),
    Timeout(String),
    Status(StatusCode, String),
    EmptyBody,
    MalformedResponse(String),
    Serde(JsonError),
}

impl ChatApiError {
    /// HTTP status attached to the error, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status, _) => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    pub fn message_or_fallback(&self) -> Option<String> {
        let nested = match &self.error {
            Some(Value::String(message)) => non_empty_string(message),
            Some(Value::Object(fields)) => fields
                .get("message")
                .and_then(Value::as_str)
                .and_then(non_empty_string),
            _ => None,
        };

        nested
            .or_else(|| self.message.as_deref().and_then(non_empty_string))
            .map(ToOwned::to_owned)
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::InvalidRequestPayload(message) => {
                write!(f, "invalid request payload: {message}")
            }
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Timeout(message) => write!(f, "request timed out: {message}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::EmptyBody => write!(f, "response has no body"),
            Self::MalformedResponse(message) => write!(f, "malformed response: {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for ChatApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Request(error)
        }
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a human-readable message from a non-2xx response body.
///
/// Recognizes `{"error":{"message":..}}`, `{"error":".."}` and
/// `{"message":..}`, returning only that message; other JSON fields are not
/// kept. Anything else surfaces the raw body text.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    serde_json::from_str::<ErrorPayload>(trimmed)
        .ok()
        .and_then(|payload| payload.message_or_fallback())
        .unwrap_or_else(|| trimmed.to_string())
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
