//! Chat controller: validation, delivery and manual retry.
//!
//! Implements one user turn:
//! 1. Validate the input (non-empty, within the length limit, no request in flight)
//! 2. Append the user message right away
//! 3. Deliver it with the configured [`DeliveryMode`]
//! 4. Feed the reply (or the failure) back through the store
//!
//! With the default HTTP mode the request/response exchange is authoritative
//! and the streaming channel only supplies live `typing`/`chunk` updates for
//! the same turn.

use std::cell::Cell;
use std::rc::Rc;
use futures::StreamExt;
use news_types::{
    ChatError, Result,
    api::ChatRequest,
    config::{ClientConfig, DeliveryMode},
    event::{CompletePayload, EventKind},
};
use crate::assembly::ChatAction;
use crate::ports::{ApiPort, RuntimePort};
use crate::store::{ChatStore, Epoch};
use crate::transport::TransportClient;

pub struct ChatController {
    config: ClientConfig,
    store: ChatStore,
    api: Rc<dyn ApiPort>,
    transport: TransportClient,
    runtime: Rc<dyn RuntimePort>,
    retry_count: Cell<u32>,
    in_flight: Cell<bool>,
}

/// Clears the in-flight flag when a delivery ends or its future is dropped.
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ChatController {
    pub fn new(
        config: ClientConfig,
        store: ChatStore,
        api: Rc<dyn ApiPort>,
        transport: TransportClient,
        runtime: Rc<dyn RuntimePort>,
    ) -> Self {
        Self {
            config,
            store,
            api,
            transport,
            runtime,
            retry_count: Cell::new(0),
            in_flight: Cell::new(false),
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.get()
    }

    /// A request for the current turn has not returned yet. In HTTP mode
    /// this outlives the live stream finishing the turn.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Trimmed text if it may be sent.
    pub fn validate(&self, text: &str) -> Result<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".to_string()));
        }
        let max = self.config.max_message_length;
        if trimmed.chars().count() > max {
            return Err(ChatError::Validation(format!(
                "Message is too long (maximum {} characters)",
                max
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Send a new user turn.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let text = self.validate(text)?;
        let session_id = self.ready_session()?;
        let _in_flight = self.begin_delivery();

        self.store.apply(ChatAction::UserTurn { text: text.clone() });
        self.deliver(&text, &session_id).await
    }

    /// Re-drive a failed turn, at most `max_retries` times until a success
    /// or `clear_error` resets the counter.
    pub async fn retry(&self, text: &str) -> Result<()> {
        let attempts = self.retry_count.get();
        if attempts >= self.config.max_retries {
            return Err(ChatError::RetryExhausted { attempts });
        }
        let text = self.validate(text)?;
        let session_id = self.ready_session()?;
        let _in_flight = self.begin_delivery();

        self.retry_count.set(attempts + 1);
        log::info!("Retrying message (attempt {}/{})", attempts + 1, self.config.max_retries);
        self.store.apply(ChatAction::RetryStarted { text: text.clone() });
        self.deliver(&text, &session_id).await
    }

    pub fn clear_error(&self) {
        self.retry_count.set(0);
        self.store.apply(ChatAction::ErrorDismissed);
    }

    /// Route transport events for `session_id` into the store and connect.
    ///
    /// Subscriptions from a previous binding are dropped first, so handlers
    /// of an old session can never touch the new one.
    pub fn bind_transport(&self, session_id: &str) {
        self.transport.disconnect();

        let epoch = self.store.epoch();
        for kind in EventKind::ALL {
            let store = self.store.clone();
            self.transport.subscribe(kind, move |event| {
                let Some(action) = ChatAction::from_transport(event) else {
                    return Ok(());
                };
                if store.apply_if_current(epoch, action) {
                    Ok(())
                } else {
                    Err(ChatError::Cancelled)
                }
            });
        }

        let transport = self.transport.clone();
        let session_id = session_id.to_string();
        self.runtime.spawn(Box::pin(async move {
            if let Err(e) = transport.connect(&session_id).await {
                log::warn!("Live updates unavailable for {}: {}", session_id, e);
            }
        }));
    }

    pub fn unbind_transport(&self) {
        self.transport.disconnect();
    }

    fn ready_session(&self) -> Result<String> {
        let state = self.store.snapshot();
        let session_id = state.session_id.clone().ok_or(ChatError::NoActiveSession)?;
        if state.is_busy() || self.in_flight.get() {
            return Err(ChatError::Validation(
                "Please wait for the current reply to finish".to_string(),
            ));
        }
        Ok(session_id)
    }

    fn begin_delivery(&self) -> InFlight<'_> {
        self.in_flight.set(true);
        InFlight(&self.in_flight)
    }

    async fn deliver(&self, text: &str, session_id: &str) -> Result<()> {
        let epoch = self.store.epoch();
        let result = match self.config.delivery {
            DeliveryMode::Http => self.deliver_http(text, session_id, epoch).await,
            DeliveryMode::HttpStream => self.deliver_stream(text, session_id, epoch).await,
            DeliveryMode::Socket => self.deliver_socket(text, session_id, epoch),
        };
        match &result {
            Ok(()) => self.retry_count.set(0),
            Err(e) => log::warn!("{} delivery failed: {}", self.config.delivery.label(), e),
        }
        result
    }

    async fn deliver_http(&self, text: &str, session_id: &str, epoch: Epoch) -> Result<()> {
        let req = ChatRequest {
            message: text.to_string(),
            session_id: session_id.to_string(),
        };
        match self.api.send_chat(req).await {
            Ok(reply) => {
                if self.store.apply_if_current(epoch, ChatAction::ReplyReceived(reply)) {
                    Ok(())
                } else {
                    Err(ChatError::Cancelled)
                }
            }
            Err(e) => {
                self.store.apply_if_current(epoch, ChatAction::SendFailed { message: e.user_message() });
                Err(e)
            }
        }
    }

    async fn deliver_stream(&self, text: &str, session_id: &str, epoch: Epoch) -> Result<()> {
        let req = ChatRequest {
            message: text.to_string(),
            session_id: session_id.to_string(),
        };
        let mut chunks = self.api.stream_chat(req);
        let mut completed = false;

        while let Some(item) = chunks.next().await {
            if !self.store.is_current(epoch) {
                return Err(ChatError::Cancelled);
            }
            match item {
                Ok(chunk) => {
                    completed = chunk.is_complete;
                    self.store.apply(ChatAction::ChunkReceived(chunk));
                    if completed {
                        break;
                    }
                }
                Err(e) => {
                    self.store.apply(ChatAction::SendFailed { message: e.user_message() });
                    return Err(e);
                }
            }
        }

        if !completed {
            // Stream ended without a final frame: close whatever arrived.
            self.store.apply_if_current(epoch, ChatAction::CompleteReceived(CompletePayload::default()));
        }
        Ok(())
    }

    fn deliver_socket(&self, text: &str, session_id: &str, epoch: Epoch) -> Result<()> {
        self.transport.send(text, session_id).map_err(|e| {
            self.store.apply_if_current(epoch, ChatAction::SendFailed { message: e.user_message() });
            e
        })
    }
}
