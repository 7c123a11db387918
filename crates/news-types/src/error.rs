use thiserror::Error;

/// Banner text used when the server gives no usable message.
pub const GENERIC_SERVER_ERROR: &str = "Sorry, something went wrong. Please try again.";

const NETWORK_ERROR_TEXT: &str =
    "Unable to reach the news service. Check your connection and try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Streaming channel is not connected")]
    NotConnected,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (HTTP {status}): {}", .message.as_deref().unwrap_or(GENERIC_SERVER_ERROR))]
    Server { status: u16, message: Option<String> },

    #[error("Failed to create session: {0}")]
    SessionCreate(String),

    #[error("Failed to clear session: {0}")]
    SessionClear(String),

    #[error("Connection failed after {attempts} reconnection attempts")]
    ConnectionFailed { attempts: u32 },

    #[error("Retry limit reached after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("No active session")]
    NoActiveSession,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Text shown to the user in the error banner and inline error messages.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Validation(reason) => reason.clone(),
            ChatError::Network(_) => NETWORK_ERROR_TEXT.to_string(),
            ChatError::Server { message, .. } => message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string()),
            ChatError::ConnectionFailed { .. } => {
                "Lost connection to the live update channel. Reconnect to resume streaming.".to_string()
            }
            ChatError::RetryExhausted { .. } => {
                "Retry limit reached. Dismiss the error or reload the page.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
