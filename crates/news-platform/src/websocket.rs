//! WebSocket adapter for the live update channel.
//!
//! Wraps `gloo_net::websocket::futures::WebSocket`. Outbound frames go
//! through an unbounded queue drained by a forwarding task, so the core can
//! send without awaiting. Inbound frames and the close notification come
//! back as [`ChannelMessage`]s.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{self, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message, State, WebSocketError};
use gloo_timers::future::TimeoutFuture;

use news_core::ports::{ChannelConnection, ChannelMessage, ChannelPort, ChannelSink};
use news_types::{ChatError, Result};

const OPEN_POLL_MS: u32 = 50;
const OPEN_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketChannel;

impl WebSocketChannel {
    pub fn new() -> Self {
        Self
    }
}

struct WebSocketSink {
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelSink for WebSocketSink {
    fn send(&self, text: String) -> Result<()> {
        self.outbound
            .unbounded_send(text)
            .map_err(|_| ChatError::NotConnected)
    }

    fn close(&self) {
        self.outbound.close_channel();
    }
}

#[async_trait(?Send)]
impl ChannelPort for WebSocketChannel {
    async fn open(&self, url: &str) -> Result<ChannelConnection> {
        let ws = WebSocket::open(url).map_err(|e| ChatError::Network(e.to_string()))?;
        wait_until_open(&ws, url).await?;

        let (write, read) = ws.split();
        let (outbound, queued) = mpsc::unbounded::<String>();
        wasm_bindgen_futures::spawn_local(async move {
            let frames = queued.map(|text| Ok::<_, WebSocketError>(Message::Text(text)));
            if let Err(e) = frames.forward(write).await {
                log::warn!("WebSocket writer stopped: {}", e);
            }
        });

        let incoming = read
            .map(to_channel_message)
            .chain(stream::once(async {
                ChannelMessage::Closed {
                    reason: "stream ended".to_string(),
                }
            }));

        Ok(ChannelConnection {
            sink: Box::new(WebSocketSink { outbound }),
            incoming: Box::pin(incoming),
        })
    }
}

async fn wait_until_open(ws: &WebSocket, url: &str) -> Result<()> {
    let mut waited = 0;
    loop {
        match ws.state() {
            State::Open => return Ok(()),
            State::Connecting if waited < OPEN_TIMEOUT_MS => {
                TimeoutFuture::new(OPEN_POLL_MS).await;
                waited += OPEN_POLL_MS;
            }
            State::Connecting => {
                return Err(ChatError::Network(format!("Timed out connecting to {}", url)));
            }
            _ => return Err(ChatError::Network(format!("Could not connect to {}", url))),
        }
    }
}

fn to_channel_message(item: std::result::Result<Message, WebSocketError>) -> ChannelMessage {
    match item {
        Ok(Message::Text(text)) => ChannelMessage::Text(text),
        Ok(Message::Bytes(bytes)) => ChannelMessage::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Err(WebSocketError::ConnectionClose(event)) => ChannelMessage::Closed {
            reason: if event.reason.is_empty() {
                format!("closed with code {}", event.code)
            } else {
                event.reason
            },
        },
        Err(e) => ChannelMessage::Error(e.to_string()),
    }
}
