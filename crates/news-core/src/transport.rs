//! Streaming transport client.
//!
//! Owns the single channel connection of a session, turns inbound frames
//! into typed [`TransportEvent`]s on the [`EventBus`], and re-establishes
//! the connection after an unexpected close:
//! 1. emit `Disconnected`
//! 2. for each attempt: emit `Reconnecting`, wait `policy.delay_for(attempt)`, reopen
//! 3. on success re-announce the bound session and emit `Connected`
//! 4. when attempts run out: state `Failed`, emit `ConnectionFailed`
//!
//! Every connection belongs to a generation. `disconnect()` starts a new one,
//! so loops and pumps from an older generation stop without side effects.

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use futures::{Stream, StreamExt};
use news_types::{
    ChatError, Result,
    config::ReconnectPolicy,
    event::{ClientFrame, ConnectionState, EventKind, OutboundMessage, ServerFrame, TransportEvent},
    message::now_rfc3339,
};
use crate::event_bus::{EventBus, SubscriptionHandle};
use crate::ports::{ChannelConnection, ChannelMessage, ChannelPort, ChannelSink, RuntimePort};

const CLIENT_DISCONNECT_REASON: &str = "client disconnect";

/// Clone-cheap handle to the transport; all clones share one connection.
#[derive(Clone)]
pub struct TransportClient {
    inner: Rc<TransportInner>,
}

struct TransportInner {
    url: String,
    policy: ReconnectPolicy,
    channel: Rc<dyn ChannelPort>,
    runtime: Rc<dyn RuntimePort>,
    bus: EventBus,
    state: Cell<ConnectionState>,
    session_id: RefCell<Option<String>>,
    sink: RefCell<Option<Box<dyn ChannelSink>>>,
    generation: Cell<u64>,
}

impl TransportClient {
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        channel: Rc<dyn ChannelPort>,
        runtime: Rc<dyn RuntimePort>,
    ) -> Self {
        Self {
            inner: Rc::new(TransportInner {
                url: url.into(),
                policy,
                channel,
                runtime,
                bus: EventBus::new(),
                state: Cell::new(ConnectionState::Disconnected),
                session_id: RefCell::new(None),
                sink: RefCell::new(None),
                generation: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Session the channel is bound to, if any
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.borrow().clone()
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&TransportEvent) -> Result<()> + 'static,
    {
        self.inner.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.bus.unsubscribe(handle)
    }

    /// Establish the channel for `session_id`.
    ///
    /// Idempotent: while connected to the same session this is a no-op,
    /// while connected to another session the new one is announced, and
    /// while a (re)connection is in progress only the binding changes.
    pub async fn connect(&self, session_id: &str) -> Result<()> {
        let previous = self
            .inner
            .session_id
            .replace(Some(session_id.to_string()));

        match self.state() {
            ConnectionState::Connected => {
                if previous.as_deref() != Some(session_id) {
                    self.announce(session_id)?;
                }
                return Ok(());
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => return Ok(()),
            ConnectionState::Disconnected | ConnectionState::Failed => {}
        }

        let generation = self.next_generation();
        self.inner.state.set(ConnectionState::Connecting);
        log::info!("Connecting to {}", self.inner.url);

        match self.inner.channel.open(&self.inner.url).await {
            Ok(conn) => {
                if !self.is_current(generation) {
                    conn.sink.close();
                    return Err(ChatError::Cancelled);
                }
                self.install(generation, conn);
                Ok(())
            }
            Err(e) => {
                if !self.is_current(generation) {
                    return Err(ChatError::Cancelled);
                }
                log::warn!("Connection to {} failed: {}", self.inner.url, e);
                self.emit(TransportEvent::ConnectError { message: e.to_string() });
                self.reconnect(generation).await
            }
        }
    }

    /// Send a user message over the channel. Does not wait for a reply.
    pub fn send(&self, message: &str, session_id: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }
        self.send_frame(&ClientFrame::SendMessage(OutboundMessage {
            session_id: session_id.to_string(),
            message: message.to_string(),
            timestamp: now_rfc3339(),
        }))
    }

    /// Tear down the channel and drop every subscription. Idempotent.
    pub fn disconnect(&self) {
        self.next_generation();
        let was = self.inner.state.replace(ConnectionState::Disconnected);
        if let Some(sink) = self.inner.sink.borrow_mut().take() {
            sink.close();
        }
        if was != ConnectionState::Disconnected {
            log::info!("Disconnected from {}", self.inner.url);
            self.emit(TransportEvent::Disconnected {
                reason: CLIENT_DISCONNECT_REASON.to_string(),
            });
        }
        self.inner.bus.clear();
    }

    fn install(&self, generation: u64, conn: ChannelConnection) {
        let ChannelConnection { sink, incoming } = conn;
        *self.inner.sink.borrow_mut() = Some(sink);
        self.inner.state.set(ConnectionState::Connected);

        let session_id = self.session_id();
        if let Some(id) = &session_id {
            if let Err(e) = self.announce(id) {
                log::warn!("Failed to join session {}: {}", id, e);
            }
        }

        let this = self.clone();
        self.inner
            .runtime
            .spawn(Box::pin(async move { this.pump(generation, incoming).await }));

        log::info!("Connected to {}", self.inner.url);
        self.emit(TransportEvent::Connected { session_id });
    }

    async fn pump(self, generation: u64, mut incoming: Pin<Box<dyn Stream<Item = ChannelMessage>>>) {
        let mut reason = "transport close".to_string();
        while let Some(message) = incoming.next().await {
            if !self.is_current(generation) {
                return;
            }
            match message {
                ChannelMessage::Text(text) => self.handle_frame(&text),
                ChannelMessage::Error(e) => log::warn!("Channel error: {}", e),
                ChannelMessage::Closed { reason: r } => {
                    reason = r;
                    break;
                }
            }
        }

        if !self.is_current(generation) {
            return;
        }
        self.inner.sink.borrow_mut().take();
        self.inner.state.set(ConnectionState::Reconnecting);
        log::warn!("Channel closed unexpectedly: {}", reason);
        self.emit(TransportEvent::Disconnected { reason });

        if let Err(e) = self.reconnect(generation).await {
            log::warn!("Giving up on {}: {}", self.inner.url, e);
        }
    }

    async fn reconnect(&self, generation: u64) -> Result<()> {
        let max_attempts = self.inner.policy.max_attempts;
        for attempt in 1..=max_attempts {
            if !self.is_current(generation) {
                return Err(ChatError::Cancelled);
            }
            self.inner.state.set(ConnectionState::Reconnecting);
            self.emit(TransportEvent::Reconnecting { attempt });

            let delay = self.inner.policy.delay_for(attempt);
            log::debug!("Reconnect attempt {}/{} in {}ms", attempt, max_attempts, delay);
            self.inner.runtime.sleep(delay).await;
            if !self.is_current(generation) {
                return Err(ChatError::Cancelled);
            }

            match self.inner.channel.open(&self.inner.url).await {
                Ok(conn) => {
                    if !self.is_current(generation) {
                        conn.sink.close();
                        return Err(ChatError::Cancelled);
                    }
                    log::info!("Reconnected after {} attempt(s)", attempt);
                    self.install(generation, conn);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("Reconnect attempt {} failed: {}", attempt, e);
                    self.emit(TransportEvent::ConnectError { message: e.to_string() });
                }
            }
        }

        self.inner.state.set(ConnectionState::Failed);
        self.emit(TransportEvent::ConnectionFailed { attempts: max_attempts });
        Err(ChatError::ConnectionFailed { attempts: max_attempts })
    }

    fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<ServerFrame>(text) {
            Ok(frame) => self.emit(frame.into()),
            Err(e) => log::warn!("Ignoring malformed frame ({}): {}", e, text),
        }
    }

    fn announce(&self, session_id: &str) -> Result<()> {
        log::debug!("Joining session {}", session_id);
        self.send_frame(&ClientFrame::JoinSession(session_id.to_string()))
    }

    fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        let text = serde_json::to_string(frame)?;
        match self.inner.sink.borrow().as_ref() {
            Some(sink) => sink.send(text),
            None => Err(ChatError::NotConnected),
        }
    }

    fn emit(&self, event: TransportEvent) {
        let invoked = self.inner.bus.emit(&event);
        if invoked == 0 {
            log::trace!("No subscribers for {:?}", event.kind());
        }
    }

    fn next_generation(&self) -> u64 {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.get() == generation
    }
}
