//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `news-core` (pure Rust).
//! Implementations live in `news-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::future::Future;
use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use news_types::{
    Result,
    api::{ChatReply, ChatRequest, HealthReport, ServerStats},
    event::ChunkPayload,
    message::Message,
};

pub type LocalBoxFuture = Pin<Box<dyn Future<Output = ()>>>;
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChunkPayload>>>>;

// ─── Backend API Port ────────────────────────────────────────

#[async_trait(?Send)]
pub trait ApiPort {
    /// `POST /api/sessions`: returns the new session identifier
    async fn create_session(&self) -> Result<String>;

    /// `GET /api/sessions/{id}/history`
    async fn session_history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// `POST /api/sessions/{id}/clear`
    async fn clear_session(&self, session_id: &str) -> Result<()>;

    /// `GET /api/sessions/stats`
    async fn session_stats(&self) -> Result<ServerStats>;

    /// `POST /api/chat`: one request, one complete reply
    async fn send_chat(&self, req: ChatRequest) -> Result<ChatReply>;

    /// `POST /api/chat/stream`: the reply as a stream of chunk frames
    fn stream_chat(&self, req: ChatRequest) -> ChunkStream;

    /// `GET /api/health` or `/api/health/detailed`
    async fn health(&self, detailed: bool) -> Result<HealthReport>;
}

// ─── Streaming Channel Port ──────────────────────────────────

/// What the channel adapter yields while a connection is open
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// A text frame (JSON envelope)
    Text(String),
    /// The connection closed; no more messages follow
    Closed { reason: String },
    /// A non-terminal transport error
    Error(String),
}

/// Outbound half of an open channel
pub trait ChannelSink {
    fn send(&self, text: String) -> Result<()>;
    fn close(&self);
}

/// An open bidirectional channel
pub struct ChannelConnection {
    pub sink: Box<dyn ChannelSink>,
    pub incoming: Pin<Box<dyn Stream<Item = ChannelMessage>>>,
}

#[async_trait(?Send)]
pub trait ChannelPort {
    /// Open a channel to `url`
    async fn open(&self, url: &str) -> Result<ChannelConnection>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Runtime Port ────────────────────────────────────────────

/// Task spawning and timers of the single-threaded host
pub trait RuntimePort {
    /// Run a future to completion in the background
    fn spawn(&self, task: LocalBoxFuture);

    /// Resolve after `ms` milliseconds
    fn sleep(&self, ms: u64) -> LocalBoxFuture;
}
