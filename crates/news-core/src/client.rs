//! Chat client: wires the store, session manager, controller and
//! transport around one set of ports.

use std::rc::Rc;
use news_types::{
    ChatError, Result,
    api::{HealthReport, ServerStats},
    config::ClientConfig,
    session::SessionSnapshot,
};
use crate::assembly::{ChatAction, ChatState};
use crate::controller::ChatController;
use crate::ports::{ApiPort, ChannelPort, RuntimePort, StoragePort};
use crate::session::SessionManager;
use crate::store::ChatStore;
use crate::transport::TransportClient;

/// Platform adapters the client runs on
#[derive(Clone)]
pub struct Ports {
    pub api: Rc<dyn ApiPort>,
    pub channel: Rc<dyn ChannelPort>,
    pub storage: Rc<dyn StoragePort>,
    pub runtime: Rc<dyn RuntimePort>,
}

pub struct ChatClient {
    store: ChatStore,
    sessions: SessionManager,
    controller: ChatController,
    transport: TransportClient,
}

impl ChatClient {
    pub fn new(config: ClientConfig, ports: Ports) -> Self {
        let store = ChatStore::new(ports.runtime.clone(), config.typing_timeout_ms);
        let transport = TransportClient::new(
            config.socket_url.clone(),
            config.reconnect.clone(),
            ports.channel,
            ports.runtime.clone(),
        );
        let sessions = SessionManager::new(
            ports.api.clone(),
            ports.storage,
            store.clone(),
            config.session_storage_key.clone(),
        );
        let controller = ChatController::new(
            config,
            store.clone(),
            ports.api,
            transport.clone(),
            ports.runtime,
        );
        Self {
            store,
            sessions,
            controller,
            transport,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    pub fn state(&self) -> Rc<ChatState> {
        self.store.snapshot()
    }

    /// Resume or create the session, then start live updates for it.
    pub async fn start(&self) -> Result<String> {
        let session_id = self.sessions.initialize().await?;
        self.controller.bind_transport(&session_id);
        Ok(session_id)
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.controller.send_message(text).await
    }

    pub async fn retry(&self, text: &str) -> Result<()> {
        self.controller.retry(text).await
    }

    /// Retry the most recent user message.
    pub async fn retry_last(&self) -> Result<()> {
        let text = self
            .state()
            .last_user_text()
            .map(String::from)
            .ok_or_else(|| ChatError::Validation("There is no message to retry".to_string()))?;
        self.controller.retry(&text).await
    }

    pub fn clear_error(&self) {
        self.controller.clear_error();
    }

    pub fn retry_count(&self) -> u32 {
        self.controller.retry_count()
    }

    /// Replace the session with a new one and move live updates over to it.
    pub async fn new_session(&self) -> Result<String> {
        let session_id = self.sessions.restart().await?;
        self.controller.clear_error();
        self.controller.bind_transport(&session_id);
        Ok(session_id)
    }

    /// Rejected while a reply is pending so it cannot land in the emptied
    /// conversation.
    pub async fn clear_session(&self) -> Result<()> {
        if self.controller.is_in_flight() || self.state().is_busy() {
            return Err(ChatError::Validation(
                "Please wait for the current reply to finish".to_string(),
            ));
        }
        self.sessions.clear().await
    }

    /// Re-open live updates for the current session after they failed.
    /// Existing subscriptions are kept.
    pub async fn reconnect(&self) -> Result<()> {
        let session_id = self
            .state()
            .session_id
            .clone()
            .ok_or(ChatError::NoActiveSession)?;
        self.transport.connect(&session_id).await?;
        self.store.apply(ChatAction::ErrorDismissed);
        Ok(())
    }

    pub fn export_snapshot(&self) -> SessionSnapshot {
        self.sessions.export_snapshot()
    }

    pub async fn server_stats(&self) -> Result<ServerStats> {
        self.sessions.server_stats().await
    }

    pub async fn health(&self, detailed: bool) -> Result<HealthReport> {
        self.sessions.health(detailed).await
    }

    /// Disconnect and drop local state; in-flight results are discarded.
    pub fn shutdown(&self) {
        self.controller.unbind_transport();
        self.store.apply(ChatAction::Reset);
        log::info!("Chat client shut down");
    }
}
