//! Incremental decoder for the `POST /api/chat/stream` response body.
//!
//! Frames look like `data: {json}\n\n`. Network reads can split a frame (or a
//! UTF-8 sequence) anywhere, so bytes are buffered until a blank line ends
//! the frame.

use serde_json::Value;
use news_types::{ChatError, Result, event::ChunkPayload};

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes; returns every frame completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<ChunkPayload>> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some((end, separator)) = frame_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + separator).collect();
            if let Some(frame) = parse_frame(&raw[..end]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame the server did not terminate with a blank line.
    pub fn finish(&mut self) -> Option<Result<ChunkPayload>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_frame(&rest)
    }
}

/// Position and length of the first frame separator
fn frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|i| (i, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_frame(raw: &[u8]) -> Option<Result<ChunkPayload>> {
    let text = String::from_utf8_lossy(raw);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect();
    if data.is_empty() {
        return None; // comment or event-only frame
    }
    let payload = data.join("\n");
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => return Some(Err(e.into())),
    };
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Some(Err(ChatError::Other(message.to_string())));
    }
    Some(serde_json::from_value(value).map_err(ChatError::from))
}
