//! JavaScript facade over the chat client.
//!
//! Async operations return promises that resolve with plain JS values
//! (serialized through serde) and reject with an `Error` whose message is
//! the banner text for that failure.

use std::rc::Rc;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::Promise;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use news_core::client::{ChatClient, Ports};
use news_platform::storage::auto_detect_storage;
use news_platform::{BrowserRuntime, HttpApiClient, WebSocketChannel};
use news_types::{ChatError, config::ClientConfig};

#[wasm_bindgen]
pub struct NewsChatClient {
    inner: Rc<ChatClient>,
}

#[wasm_bindgen]
impl NewsChatClient {
    /// `config` is an optional partial `ClientConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<NewsChatClient, JsValue> {
        let config = parse_config(&config)?;
        log::info!(
            "Chat client: api={} socket={} delivery={}",
            config.api_base_url,
            config.socket_url,
            config.delivery.label()
        );
        let ports = Ports {
            api: Rc::new(HttpApiClient::from_config(&config)),
            channel: Rc::new(WebSocketChannel::new()),
            storage: auto_detect_storage(),
            runtime: Rc::new(BrowserRuntime::new()),
        };
        Ok(Self {
            inner: Rc::new(ChatClient::new(config, ports)),
        })
    }

    /// Resolves with the active session id.
    pub fn start(&self) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let session_id = client.start().await.map_err(to_js_error)?;
            Ok(JsValue::from_str(&session_id))
        })
    }

    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, text: String) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            client.send_message(&text).await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Retry `text`, or the last user message when omitted.
    pub fn retry(&self, text: Option<String>) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let result = match text {
                Some(text) => client.retry(&text).await,
                None => client.retry_last().await,
            };
            result.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Re-open live updates after `ConnectionError`, keeping the session.
    pub fn reconnect(&self) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            client.reconnect().await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = retryCount)]
    pub fn retry_count(&self) -> u32 {
        self.inner.retry_count()
    }

    #[wasm_bindgen(js_name = clearError)]
    pub fn clear_error(&self) {
        self.inner.clear_error();
    }

    /// Resolves with the new session id.
    #[wasm_bindgen(js_name = newSession)]
    pub fn new_session(&self) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let session_id = client.new_session().await.map_err(to_js_error)?;
            Ok(JsValue::from_str(&session_id))
        })
    }

    #[wasm_bindgen(js_name = clearSession)]
    pub fn clear_session(&self) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            client.clear_session().await.map_err(to_js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = exportSnapshot)]
    pub fn export_snapshot(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.inner.export_snapshot())
    }

    /// Current state: `{ sessionId, messages, typing, status, error, connection }`
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js_value(&*self.inner.state())
    }

    /// Call `callback(state)` after every state change. Returns a watcher id.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) -> f64 {
        let id = self.inner.store().watch(move |state| {
            let value = match JsValue::from_serde(&**state) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Could not serialize state for listener: {}", e);
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                log::warn!("State listener threw: {:?}", e);
            }
        });
        id as f64
    }

    #[wasm_bindgen(js_name = offChange)]
    pub fn off_change(&self, id: f64) {
        self.inner.store().unwatch(id as u64);
    }

    pub fn stats(&self) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let stats = client.server_stats().await.map_err(to_js_error)?;
            to_js_value(&stats)
        })
    }

    pub fn health(&self, detailed: Option<bool>) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let report = client
                .health(detailed.unwrap_or(false))
                .await
                .map_err(to_js_error)?;
            to_js_value(&report)
        })
    }

    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

fn parse_config(value: &JsValue) -> Result<ClientConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ClientConfig::default());
    }
    value
        .into_serde::<ClientConfig>()
        .map_err(|e| to_js_error(ChatError::Validation(format!("Invalid config: {}", e))))
}

fn to_js_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|e| to_js_error(ChatError::from(e)))
}

fn to_js_error(e: ChatError) -> JsValue {
    let error = js_sys::Error::new(&e.user_message());
    error.set_name(error_name(&e));
    error.into()
}

fn error_name(e: &ChatError) -> &'static str {
    match e {
        ChatError::Validation(_) => "ValidationError",
        ChatError::NotConnected | ChatError::ConnectionFailed { .. } => "ConnectionError",
        ChatError::Network(_) | ChatError::Server { .. } => "NetworkError",
        ChatError::RetryExhausted { .. } => "RetryExhaustedError",
        ChatError::SessionCreate(_) | ChatError::SessionClear(_) | ChatError::NoActiveSession => {
            "SessionError"
        }
        ChatError::Cancelled => "AbortError",
        _ => "ChatError",
    }
}
