use serde::{Deserialize, Serialize};

/// Author of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "bot")]
    Assistant,
    System,
    Error,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Empty for history entries the backend sent without one
    #[serde(default)]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// True only while an assistant reply is still receiving chunks
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Retrieval context attached to a completed assistant reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default)]
    pub context: Vec<ContextSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.source.is_none()
    }
}

/// One retrieved news passage and how closely it matched the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnippet {
    #[serde(default, alias = "text")]
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Message {
    fn new(id: impl Into<String>, role: Role, content: impl Into<String>, streaming: bool) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            streaming,
            timestamp: now_rfc3339(),
            metadata: None,
        }
    }

    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::User, text, false)
    }

    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, text, false)
    }

    /// An assistant message that is still receiving chunks.
    pub fn streaming_assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, text, true)
    }

    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::Error, text, false)
    }

    pub fn with_metadata(mut self, metadata: Option<MessageMetadata>) -> Self {
        self.metadata = metadata.filter(|m| !m.is_empty());
        self
    }

    /// The "open" assistant message: the only one allowed to change.
    pub fn is_open(&self) -> bool {
        self.role == Role::Assistant && self.streaming
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
