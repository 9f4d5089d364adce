use serde::{Deserialize, Serialize};

/// One role-tagged message as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequestMessage {
    pub role: String,
    pub content: String,
}

impl ChatRequestMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body shared by the stream and fallback endpoints.
///
/// The service is stateless per call, so `messages` carries the whole
/// conversation in chat order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatRequestMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl ChatRequest {
    /// Blank strategies are dropped so the field is omitted from the body.
    pub fn new(messages: Vec<ChatRequestMessage>, strategy: Option<String>) -> Self {
        Self {
            messages,
            strategy: strategy.filter(|value| !value.trim().is_empty()),
        }
    }
}

/// Successful body of the fallback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub message: String,
}
