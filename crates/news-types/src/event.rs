use serde::{Deserialize, Serialize};

use crate::message::MessageMetadata;

/// A fragment of an assistant reply, from `message_chunk` or an SSE frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    #[serde(default)]
    pub chunk: String,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChunkPayload {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            chunk: text.into(),
            ..Self::default()
        }
    }

    pub fn last(text: impl Into<String>) -> Self {
        Self {
            chunk: text.into(),
            is_complete: true,
            ..Self::default()
        }
    }
}

/// Explicit end of turn; `full_response` is authoritative over the chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    #[serde(default)]
    pub full_response: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Text(String),
    Detail {
        #[serde(default)]
        message: String,
    },
}

impl ErrorPayload {
    pub fn message(&self) -> &str {
        match self {
            ErrorPayload::Text(s) => s,
            ErrorPayload::Detail { message } => message,
        }
    }
}

/// Frames the server pushes over the streaming channel.
/// Encoded as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    Typing(bool),
    MessageChunk(ChunkPayload),
    MessageComplete(CompletePayload),
    Error(ErrorPayload),
}

/// Frames the client sends over the streaming channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinSession(String),
    SendMessage(OutboundMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub session_id: String,
    pub message: String,
    pub timestamp: String,
}

/// Lifecycle of the streaming connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Events the transport client delivers to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected { session_id: Option<String> },
    Disconnected { reason: String },
    ConnectError { message: String },
    Reconnecting { attempt: u32 },
    /// Terminal: reconnection attempts are exhausted
    ConnectionFailed { attempts: u32 },
    Typing { active: bool },
    Chunk(ChunkPayload),
    Complete(CompletePayload),
    Error { message: String },
}

/// Discriminant used to subscribe to one kind of [`TransportEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    ConnectError,
    Reconnecting,
    ConnectionFailed,
    Typing,
    Chunk,
    Complete,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::ConnectError,
        EventKind::Reconnecting,
        EventKind::ConnectionFailed,
        EventKind::Typing,
        EventKind::Chunk,
        EventKind::Complete,
        EventKind::Error,
    ];
}

impl TransportEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Connected { .. } => EventKind::Connected,
            TransportEvent::Disconnected { .. } => EventKind::Disconnected,
            TransportEvent::ConnectError { .. } => EventKind::ConnectError,
            TransportEvent::Reconnecting { .. } => EventKind::Reconnecting,
            TransportEvent::ConnectionFailed { .. } => EventKind::ConnectionFailed,
            TransportEvent::Typing { .. } => EventKind::Typing,
            TransportEvent::Chunk(_) => EventKind::Chunk,
            TransportEvent::Complete(_) => EventKind::Complete,
            TransportEvent::Error { .. } => EventKind::Error,
        }
    }
}

impl From<ServerFrame> for TransportEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::Typing(active) => TransportEvent::Typing { active },
            ServerFrame::MessageChunk(chunk) => TransportEvent::Chunk(chunk),
            ServerFrame::MessageComplete(done) => TransportEvent::Complete(done),
            ServerFrame::Error(payload) => TransportEvent::Error {
                message: payload.message().to_string(),
            },
        }
    }
}
