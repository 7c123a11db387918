//! REST adapter for the news chatbot backend.
//!
//! Uses browser `fetch()` via gloo-net. JSON responses arrive wrapped as
//! `{ "success": bool, "data": ... }`; the streaming endpoint answers with
//! `data: {json}` frames read straight off the response body.

use std::collections::VecDeque;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gloo_net::http::{Request, Response};
use js_sys::{Reflect, Uint8Array};
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::ReadableStreamDefaultReader;

use news_core::ports::{ApiPort, ChunkStream};
use news_core::sse::SseDecoder;
use news_types::{
    ChatError, Result,
    api::{
        error_message_from_body, ApiEnvelope, ChatReply, ChatRequest, CreatedSession,
        HealthReport, ServerStats, SessionHistory,
    },
    config::ClientConfig,
    event::ChunkPayload,
    message::Message,
};
use crate::js_error;

pub struct HttpApiClient {
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &impl serde::Serialize) -> Result<Response> {
        let response = Request::post(&self.url(path))
            .header("Content-Type", "application/json")
            .json(body)
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(network)?;
        ensure_ok(response).await
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let response = Request::get(&self.url(path))
            .send()
            .await
            .map_err(network)?;
        ensure_ok(response).await
    }
}

#[async_trait(?Send)]
impl ApiPort for HttpApiClient {
    async fn create_session(&self) -> Result<String> {
        let response = self.post_json("/api/sessions", &serde_json::json!({})).await?;
        let created: CreatedSession = envelope_data(response).await?;
        Ok(created.session_id)
    }

    async fn session_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let response = self
            .get(&format!("/api/sessions/{}/history", session_id))
            .await?;
        let history: SessionHistory = envelope_data(response).await?;
        Ok(history.messages)
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.post_json(&format!("/api/sessions/{}/clear", session_id), &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn session_stats(&self) -> Result<ServerStats> {
        let response = self.get("/api/sessions/stats").await?;
        lenient_data(response).await
    }

    async fn send_chat(&self, req: ChatRequest) -> Result<ChatReply> {
        let response = self.post_json("/api/chat", &req).await?;
        envelope_data(response).await
    }

    fn stream_chat(&self, req: ChatRequest) -> ChunkStream {
        let url = self.url("/api/chat/stream");
        let opened = async move { open_body(&url, &req).await };
        Box::pin(stream::once(opened).flat_map(|result| match result {
            Ok(reader) => body_frames(reader).left_stream(),
            Err(e) => stream::iter([Err(e)]).right_stream(),
        }))
    }

    async fn health(&self, detailed: bool) -> Result<HealthReport> {
        let path = if detailed { "/api/health/detailed" } else { "/api/health" };
        let response = self.get(path).await?;
        lenient_data(response).await
    }
}

fn network(e: gloo_net::Error) -> ChatError {
    ChatError::Network(e.to_string())
}

/// Non-2xx responses become `Server` errors carrying the body's message.
async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    log::warn!("HTTP {} from {}", status, response.url());
    Err(ChatError::Server {
        status,
        message: error_message_from_body(&body),
    })
}

async fn envelope_data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|e| ChatError::Serialization(e.to_string()))?;
    Ok(envelope.data)
}

/// Accepts both an enveloped and a bare JSON object.
async fn lenient_data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let value: Value = response
        .json()
        .await
        .map_err(|e| ChatError::Serialization(e.to_string()))?;
    let data = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };
    Ok(serde_json::from_value(data)?)
}

// ─── Streaming body ──────────────────────────────────────────

async fn open_body(url: &str, req: &ChatRequest) -> Result<ReadableStreamDefaultReader> {
    let response = Request::post(url)
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream")
        .json(req)
        .map_err(|e| ChatError::Serialization(e.to_string()))?
        .send()
        .await
        .map_err(network)?;
    let response = ensure_ok(response).await?;
    let body = response
        .body()
        .ok_or_else(|| ChatError::Network("Streaming response has no body".to_string()))?;
    Ok(body.get_reader().unchecked_into())
}

struct BodyState {
    reader: ReadableStreamDefaultReader,
    decoder: SseDecoder,
    pending: VecDeque<Result<ChunkPayload>>,
    finished: bool,
}

fn body_frames(reader: ReadableStreamDefaultReader) -> impl futures::Stream<Item = Result<ChunkPayload>> {
    let state = BodyState {
        reader,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match read_bytes(&state.reader).await {
                Ok(Some(bytes)) => {
                    let frames = state.decoder.feed(&bytes);
                    state.pending.extend(frames);
                }
                Ok(None) => {
                    state.finished = true;
                    let tail = state.decoder.finish();
                    state.pending.extend(tail);
                }
                Err(e) => {
                    state.finished = true;
                    state.pending.push_back(Err(e));
                }
            }
        }
    })
}

/// Next chunk of the body; `None` once the stream is done.
async fn read_bytes(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>> {
    let result = JsFuture::from(reader.read())
        .await
        .map_err(|e| ChatError::Network(js_error(e)))?;
    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(|e| ChatError::JsInterop(js_error(e)))?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }
    let value = Reflect::get(&result, &JsValue::from_str("value"))
        .map_err(|e| ChatError::JsInterop(js_error(e)))?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}

