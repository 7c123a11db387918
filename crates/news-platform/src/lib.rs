//! Browser adapters for the news chat client.
//!
//! Each module implements one `news-core` port on top of the browser:
//! `fetch` (via gloo-net) for the REST API, a WebSocket for live updates,
//! `localStorage` for the session id, and `spawn_local` plus gloo timers
//! for the runtime.

pub mod http;
pub mod websocket;
pub mod storage;
pub mod runtime;

pub use http::HttpApiClient;
pub use runtime::BrowserRuntime;
pub use websocket::WebSocketChannel;

/// Render a thrown JS value for an error message.
pub(crate) fn js_error(value: wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
