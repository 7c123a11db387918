//! Session lifecycle: create, resume, load history, clear, export.
//!
//! Only the session identifier is persisted (one key in the storage port);
//! history always comes back from the backend.

use std::rc::Rc;
use news_types::{
    ChatError, Result,
    api::{HealthReport, ServerStats},
    session::SessionSnapshot,
};
use crate::assembly::ChatAction;
use crate::ports::{ApiPort, StoragePort};
use crate::store::ChatStore;

/// Stored value some clients write when they had no session
const NULL_SESSION: &str = "null";

pub struct SessionManager {
    api: Rc<dyn ApiPort>,
    storage: Rc<dyn StoragePort>,
    store: ChatStore,
    storage_key: String,
}

impl SessionManager {
    pub fn new(
        api: Rc<dyn ApiPort>,
        storage: Rc<dyn StoragePort>,
        store: ChatStore,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            api,
            storage,
            store,
            storage_key: storage_key.into(),
        }
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.store.snapshot().session_id.clone()
    }

    /// Resume the persisted session, or create one if there is none.
    pub async fn initialize(&self) -> Result<String> {
        let persisted = match self.storage.get(&self.storage_key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not read persisted session ({}): {}", self.storage.backend_name(), e);
                None
            }
        };

        match persisted.filter(|id| !id.is_empty() && id != NULL_SESSION) {
            Some(session_id) => {
                log::info!("Resuming session {}", session_id);
                self.store.apply(ChatAction::SessionStarted { session_id: session_id.clone() });
                self.load_history(&session_id).await;
                Ok(session_id)
            }
            None => self.create_session().await,
        }
    }

    /// Ask the backend for a new session and make it the active one.
    pub async fn create_session(&self) -> Result<String> {
        let epoch = self.store.epoch();
        let session_id = match self.api.create_session().await {
            Ok(id) => id,
            Err(e) => {
                log::error!("Session creation failed: {}", e);
                let err = ChatError::SessionCreate(e.user_message());
                self.store.apply_if_current(epoch, ChatAction::ErrorRaised { message: err.user_message() });
                return Err(err);
            }
        };
        if !self.store.is_current(epoch) {
            return Err(ChatError::Cancelled);
        }

        self.persist(&session_id).await;
        self.store.apply(ChatAction::SessionStarted { session_id: session_id.clone() });
        log::info!("Created session {}", session_id);
        Ok(session_id)
    }

    /// Start over with a brand-new session.
    pub async fn restart(&self) -> Result<String> {
        self.create_session().await
    }

    /// Fetch persisted messages. A failure leaves an empty, usable session.
    /// Returns the number of messages loaded.
    pub async fn load_history(&self, session_id: &str) -> usize {
        let epoch = self.store.epoch();
        let messages = match self.api.session_history(session_id).await {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("Failed to load history for {}: {}", session_id, e);
                Vec::new()
            }
        };
        let count = messages.len();
        self.store.apply_if_current(epoch, ChatAction::HistoryLoaded(messages));
        count
    }

    /// Clear the active session's history.
    pub async fn clear(&self) -> Result<()> {
        let session_id = self.current_session_id().ok_or(ChatError::NoActiveSession)?;
        self.clear_session(&session_id).await
    }

    /// Delete server-side history; local messages go only if that succeeds.
    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        let epoch = self.store.epoch();
        match self.api.clear_session(session_id).await {
            Ok(()) => {
                self.store.apply_if_current(epoch, ChatAction::Cleared);
                log::info!("Cleared session {}", session_id);
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to clear session {}: {}", session_id, e);
                let err = ChatError::SessionClear(e.user_message());
                self.store.apply_if_current(epoch, ChatAction::ErrorRaised { message: err.to_string() });
                Err(err)
            }
        }
    }

    pub fn export_snapshot(&self) -> SessionSnapshot {
        let state = self.store.snapshot();
        SessionSnapshot::new(state.session_id.clone(), state.messages.clone())
    }

    pub async fn server_stats(&self) -> Result<ServerStats> {
        self.api.session_stats().await
    }

    pub async fn health(&self, detailed: bool) -> Result<HealthReport> {
        self.api.health(detailed).await
    }

    async fn persist(&self, session_id: &str) {
        if let Err(e) = self.storage.set(&self.storage_key, session_id).await {
            log::warn!("Could not persist session id: {}", e);
        }
    }
}
