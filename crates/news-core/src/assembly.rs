//! Message assembly: the reducer behind the chat store.
//!
//! Every change to the conversation goes through [`reduce`]: one action in,
//! one new [`ChatState`] (plus effects) out. Keeping all transitions here
//! enforces the single-open-message rule in one place: at most one
//! assistant message has `streaming == true`, and it is always the one
//! chunks are written into.

use serde::Serialize;
use news_types::{
    ChatError,
    api::ChatReply,
    event::{ChunkPayload, CompletePayload, ConnectionState, TransportEvent},
    message::{now_rfc3339, Message, MessageMetadata, Role},
    session::ConversationStats,
};

/// Where the current turn stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Idle,
    /// A user turn is in flight and nothing has arrived yet
    Sending,
    /// Chunks are arriving for the open assistant message
    Streaming,
}

/// Identifies one arming of the typing watchdog; older tickets are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTicket(pub u64);

/// The conversation as the UI sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub typing: bool,
    pub status: ChatStatus,
    /// Dismissible banner text
    pub error: Option<String>,
    pub connection: ConnectionState,
    #[serde(skip)]
    pub(crate) accumulator: String,
    #[serde(skip)]
    pub(crate) pending_metadata: Option<MessageMetadata>,
    #[serde(skip)]
    pub(crate) typing_ticket: u64,
    #[serde(skip)]
    pub(crate) epoch: u64,
    #[serde(skip)]
    pub(crate) next_seq: u64,
}

/// Every transition the store accepts
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    SessionStarted { session_id: String },
    HistoryLoaded(Vec<Message>),
    Cleared,
    UserTurn { text: String },
    /// Re-drive a failed turn: drops trailing error messages
    RetryStarted { text: String },
    ChunkReceived(ChunkPayload),
    CompleteReceived(CompletePayload),
    TypingChanged { active: bool },
    TypingWatchdogExpired(WatchdogTicket),
    ReplyReceived(ChatReply),
    SendFailed { message: String },
    TransportError { message: String },
    ConnectionChanged(ConnectionState),
    ConnectionFailed { attempts: u32 },
    ErrorRaised { message: String },
    ErrorDismissed,
    Reset,
}

/// Side effects requested by a transition; the store executes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ArmTypingWatchdog(WatchdogTicket),
}

impl ChatAction {
    /// Map a transport event onto the reducer. `None` for events that
    /// only matter to the transport itself.
    pub fn from_transport(event: &TransportEvent) -> Option<ChatAction> {
        let action = match event {
            TransportEvent::Connected { .. } => ChatAction::ConnectionChanged(ConnectionState::Connected),
            TransportEvent::Disconnected { .. } => {
                ChatAction::ConnectionChanged(ConnectionState::Disconnected)
            }
            TransportEvent::Reconnecting { .. } => {
                ChatAction::ConnectionChanged(ConnectionState::Reconnecting)
            }
            TransportEvent::ConnectError { .. } => return None,
            TransportEvent::ConnectionFailed { attempts } => {
                ChatAction::ConnectionFailed { attempts: *attempts }
            }
            TransportEvent::Typing { active } => ChatAction::TypingChanged { active: *active },
            TransportEvent::Chunk(chunk) => ChatAction::ChunkReceived(chunk.clone()),
            TransportEvent::Complete(done) => ChatAction::CompleteReceived(done.clone()),
            TransportEvent::Error { message } => ChatAction::TransportError {
                message: message.clone(),
            },
        };
        Some(action)
    }
}

impl ChatState {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The assistant message currently receiving chunks
    pub fn open_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_open())
    }

    /// A turn is in flight or a reply is still streaming
    pub fn is_busy(&self) -> bool {
        self.status != ChatStatus::Idle || self.open_message().is_some()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats::from_messages(&self.messages)
    }

    fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), self.next_seq)
    }

    /// A fresh state for a new or torn-down session; counters keep running.
    fn successor(&self, session_id: Option<String>) -> ChatState {
        ChatState {
            session_id,
            connection: self.connection,
            typing_ticket: self.typing_ticket + 1,
            epoch: self.epoch + 1,
            next_seq: self.next_seq,
            ..ChatState::default()
        }
    }

    fn close_open_message(&mut self) {
        for msg in self.messages.iter_mut().filter(|m| m.is_open()) {
            log::debug!("Closing unfinished assistant message {}", msg.id);
            msg.streaming = false;
        }
    }

    fn stop_typing(&mut self) {
        self.typing = false;
        self.typing_ticket += 1;
    }

    fn finish_turn(&mut self) {
        self.accumulator.clear();
        self.pending_metadata = None;
        self.stop_typing();
        self.status = ChatStatus::Idle;
    }

    /// Index of the first message after the latest user message
    fn turn_start(&self) -> usize {
        self.messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .map_or(0, |i| i + 1)
    }

    fn turn_reply_index(&self) -> Option<usize> {
        let start = self.turn_start();
        self.messages[start..]
            .iter()
            .position(|m| m.role == Role::Assistant)
            .map(|i| i + start)
    }

    fn apply_chunk(&mut self, chunk: ChunkPayload, effects: &mut Vec<Effect>) {
        self.accumulator.push_str(&chunk.chunk);
        if chunk.metadata.is_some() {
            self.pending_metadata = chunk.metadata;
        }
        let timestamp = chunk.timestamp.unwrap_or_else(now_rfc3339);
        let streaming = !chunk.is_complete;

        let last_is_open = self.messages.last().is_some_and(Message::is_open);
        if last_is_open {
            if let Some(last) = self.messages.last_mut() {
                last.content.clone_from(&self.accumulator);
                last.streaming = streaming;
                last.timestamp = timestamp;
            }
        } else {
            self.close_open_message();
            let id = self.next_id();
            let mut msg = Message::streaming_assistant(id, self.accumulator.clone());
            msg.streaming = streaming;
            msg.timestamp = timestamp;
            self.messages.push(msg);
        }

        self.typing_ticket += 1;
        if chunk.is_complete {
            let metadata = self.pending_metadata.take();
            if let Some(last) = self.messages.last_mut() {
                if last.metadata.is_none() {
                    last.metadata = metadata.filter(|m| !m.is_empty());
                }
            }
            self.finish_turn();
        } else {
            self.status = ChatStatus::Streaming;
            if self.typing {
                effects.push(Effect::ArmTypingWatchdog(WatchdogTicket(self.typing_ticket)));
            }
        }
    }

    fn apply_complete(&mut self, done: CompletePayload) {
        let full_response = done.full_response.filter(|text| !text.is_empty());
        let timestamp = done.timestamp.unwrap_or_else(now_rfc3339);
        let metadata = self.pending_metadata.take().filter(|m| !m.is_empty());

        if let Some(i) = self.messages.iter().rposition(Message::is_open) {
            let msg = &mut self.messages[i];
            if let Some(text) = full_response {
                msg.content = text;
            }
            msg.streaming = false;
            msg.timestamp = timestamp;
            if msg.metadata.is_none() {
                msg.metadata = metadata;
            }
        } else if let Some(text) = full_response {
            if self.turn_reply_index().is_none() {
                let id = self.next_id();
                let mut msg = Message::assistant(id, text).with_metadata(metadata);
                msg.timestamp = timestamp;
                self.messages.push(msg);
            } else {
                log::debug!("Completion for an already finished reply; keeping it as is");
            }
        }
        self.finish_turn();
    }

    fn apply_reply(&mut self, reply: ChatReply) {
        let metadata = reply.metadata();
        let timestamp = reply.timestamp.clone().unwrap_or_else(now_rfc3339);

        match self.turn_reply_index() {
            // The live channel already delivered this turn's reply.
            Some(i) => {
                let msg = &mut self.messages[i];
                if msg.streaming {
                    msg.content = reply.bot_response;
                    msg.streaming = false;
                    msg.timestamp = timestamp;
                }
                if msg.metadata.is_none() {
                    msg.metadata = metadata;
                }
            }
            None => {
                self.close_open_message();
                let id = self.next_id();
                let mut msg = Message::assistant(id, reply.bot_response).with_metadata(metadata);
                msg.timestamp = timestamp;
                self.messages.push(msg);
            }
        }
        self.error = None;
        self.finish_turn();
    }

    fn push_error(&mut self, message: &str) {
        self.close_open_message();
        let id = self.next_id();
        self.messages.push(Message::error(id, message));
    }
}

/// Apply one action to a state, producing the next state and its effects.
pub fn reduce(state: &ChatState, action: ChatAction) -> (ChatState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match action {
        ChatAction::SessionStarted { session_id } => {
            next = state.successor(Some(session_id));
        }
        ChatAction::HistoryLoaded(messages) => {
            next.messages = Vec::with_capacity(messages.len());
            for mut msg in messages {
                msg.streaming = false;
                if msg.id.is_empty() {
                    msg.id = next.next_id();
                }
                next.messages.push(msg);
            }
            next.finish_turn();
        }
        ChatAction::Cleared => {
            next.messages.clear();
            next.finish_turn();
        }
        ChatAction::UserTurn { text } => {
            next.close_open_message();
            next.accumulator.clear();
            next.pending_metadata = None;
            let id = next.next_id();
            next.messages.push(Message::user(id, text));
            next.status = ChatStatus::Sending;
            next.error = None;
        }
        ChatAction::RetryStarted { text } => {
            while next.messages.last().is_some_and(|m| m.role == Role::Error) {
                next.messages.pop();
            }
            let resend_same = next
                .messages
                .last()
                .is_some_and(|m| m.role == Role::User && m.content == text);
            if !resend_same {
                next.close_open_message();
                let id = next.next_id();
                next.messages.push(Message::user(id, text));
            }
            next.accumulator.clear();
            next.pending_metadata = None;
            next.status = ChatStatus::Sending;
            next.error = None;
        }
        ChatAction::ChunkReceived(chunk) => next.apply_chunk(chunk, &mut effects),
        ChatAction::CompleteReceived(done) => next.apply_complete(done),
        ChatAction::TypingChanged { active } => {
            next.typing = active;
            next.typing_ticket += 1;
            if active {
                effects.push(Effect::ArmTypingWatchdog(WatchdogTicket(next.typing_ticket)));
            }
        }
        ChatAction::TypingWatchdogExpired(ticket) => {
            if next.typing && ticket.0 == next.typing_ticket {
                log::debug!("Typing indicator stalled; clearing it");
                next.typing = false;
            }
        }
        ChatAction::ReplyReceived(reply) => next.apply_reply(reply),
        ChatAction::SendFailed { message } => {
            next.push_error(&message);
            next.error = Some(message);
            next.finish_turn();
        }
        ChatAction::TransportError { message } => {
            if next.status == ChatStatus::Streaming {
                next.close_open_message();
                next.finish_turn();
            }
            next.stop_typing();
            next.error = Some(message);
        }
        ChatAction::ConnectionChanged(connection) => {
            next.connection = connection;
        }
        ChatAction::ConnectionFailed { attempts } => {
            next.connection = ConnectionState::Failed;
            next.stop_typing();
            next.error = Some(ChatError::ConnectionFailed { attempts }.user_message());
        }
        ChatAction::ErrorRaised { message } => {
            next.error = Some(message);
        }
        ChatAction::ErrorDismissed => {
            next.error = None;
        }
        ChatAction::Reset => {
            next = state.successor(None);
        }
    }

    (next, effects)
}
