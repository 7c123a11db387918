use serde::{Deserialize, Serialize};

/// Top-level client configuration.
/// Every field has a default so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, without the `/api` suffix
    pub api_base_url: String,
    /// URL of the streaming channel
    pub socket_url: String,
    /// Maximum message length in characters
    pub max_message_length: usize,
    /// Manual retry bound per session
    pub max_retries: u32,
    /// How long a `typing(true)` signal may stall before it is dropped
    pub typing_timeout_ms: u64,
    /// Key of the persisted session identifier
    pub session_storage_key: String,
    pub delivery: DeliveryMode,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            max_message_length: 500,
            max_retries: 3,
            typing_timeout_ms: 10_000,
            session_storage_key: DEFAULT_SESSION_KEY.to_string(),
            delivery: DeliveryMode::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How a user turn is delivered to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// `POST /api/chat` is authoritative; the socket only notifies
    #[default]
    Http,
    /// `POST /api/chat/stream`, SSE frames assembled like socket chunks
    HttpStream,
    /// Legacy: send over the socket and wait for chunk/complete events
    Socket,
}

impl DeliveryMode {
    pub fn label(&self) -> &str {
        match self {
            DeliveryMode::Http => "HTTP",
            DeliveryMode::HttpStream => "HTTP stream",
            DeliveryMode::Socket => "WebSocket",
        }
    }
}

/// Automatic reconnection policy of the streaming channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 5_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given 1-based attempt: doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(32);
        self.initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms)
    }
}

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_SOCKET_URL: &str = "ws://localhost:5000/ws";
const DEFAULT_SESSION_KEY: &str = "news_chat_session_id";
