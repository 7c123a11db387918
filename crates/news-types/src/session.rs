use serde::{Deserialize, Serialize};
use crate::message::{now_rfc3339, Message, Role};

/// Point-in-time export of the active conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub stats: ConversationStats,
    pub exported_at: String,
}

impl SessionSnapshot {
    pub fn new(session_id: Option<String>, messages: Vec<Message>) -> Self {
        let stats = ConversationStats::from_messages(&messages);
        Self {
            session_id,
            messages,
            stats,
            exported_at: now_rfc3339(),
        }
    }
}

/// Message counts of a conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub error_messages: usize,
}

impl ConversationStats {
    pub fn from_messages(messages: &[Message]) -> Self {
        let count = |role: Role| messages.iter().filter(|m| m.role == role).count();
        Self {
            total_messages: messages.len(),
            user_messages: count(Role::User),
            assistant_messages: count(Role::Assistant),
            error_messages: count(Role::Error),
        }
    }
}
