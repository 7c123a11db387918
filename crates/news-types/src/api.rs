//! Wire shapes of the news chatbot REST API.
//!
//! Every JSON response is wrapped as `{ "success": bool, "data": ... }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{ContextSnippet, Message, MessageMetadata};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Body of `POST /api/chat` and `POST /api/chat/stream`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

/// `data` of a successful `POST /api/chat`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub bot_response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub context: Vec<ContextSnippet>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ChatReply {
    pub fn metadata(&self) -> Option<MessageMetadata> {
        let metadata = MessageMetadata {
            context: self.context.clone(),
            source: self.source.clone(),
        };
        (!metadata.is_empty()).then_some(metadata)
    }
}

/// Aggregate numbers from `GET /api/sessions/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub active_sessions: u64,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Liveness payload from `/api/health` and `/api/health/detailed`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "OK" | "healthy")
    }
}

/// Pulls a human-readable message out of an error response body.
pub fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| match &value[*key] {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(String::from),
            _ => None,
        })
}
