//! WASM-target tests for news-core.
//!
//! Runs EventBus, reducer and SSE decoder tests under
//! wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use news_core::assembly::{reduce, ChatAction, ChatState, ChatStatus};
use news_core::event_bus::EventBus;
use news_core::sse::SseDecoder;
use news_types::event::{ChunkPayload, CompletePayload, EventKind, TransportEvent};
use news_types::message::Role;

use std::cell::Cell;
use std::rc::Rc;

fn run(actions: Vec<ChatAction>) -> ChatState {
    actions
        .into_iter()
        .fold(ChatState::default(), |state, action| reduce(&state, action).0)
}

// ─── EventBus Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn event_bus_new_has_no_handlers() {
    let bus = EventBus::new();
    for kind in EventKind::ALL {
        assert_eq!(bus.handler_count(kind), 0);
    }
}

#[wasm_bindgen_test]
fn event_bus_clone_shares_registry() {
    let bus1 = EventBus::new();
    let bus2 = bus1.clone();
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    bus1.subscribe(EventKind::Typing, move |_| {
        h.set(h.get() + 1);
        Ok(())
    });

    bus2.emit(&TransportEvent::Typing { active: true });
    assert_eq!(hits.get(), 1);
}

#[wasm_bindgen_test]
fn event_bus_clear_drops_everything() {
    let bus = EventBus::new();
    let handle = bus.subscribe(EventKind::Chunk, |_| Ok(()));
    bus.clear();
    assert!(!bus.is_active(&handle));
    assert_eq!(bus.emit(&TransportEvent::Chunk(ChunkPayload::partial("x"))), 0);
}

// ─── Assembly Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn chunks_build_one_reply() {
    let state = run(vec![
        ChatAction::SessionStarted { session_id: "s".to_string() },
        ChatAction::UserTurn { text: "What happened today?".to_string() },
        ChatAction::ChunkReceived(ChunkPayload::partial("News ")),
        ChatAction::ChunkReceived(ChunkPayload::last("update.")),
    ]);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(state.messages[1].content, "News update.");
    assert_eq!(state.status, ChatStatus::Idle);
}

#[wasm_bindgen_test]
fn complete_replaces_content() {
    let state = run(vec![
        ChatAction::ChunkReceived(ChunkPayload::partial("draft")),
        ChatAction::CompleteReceived(CompletePayload {
            full_response: Some("final".to_string()),
            timestamp: None,
        }),
    ]);
    assert_eq!(state.messages[0].content, "final");
    assert!(!state.messages[0].streaming);
}

#[wasm_bindgen_test]
fn cleared_keeps_session() {
    let state = run(vec![
        ChatAction::SessionStarted { session_id: "keep".to_string() },
        ChatAction::UserTurn { text: "hi".to_string() },
        ChatAction::Cleared,
    ]);
    assert!(state.messages.is_empty());
    assert_eq!(state.session_id.as_deref(), Some("keep"));
}

// ─── SSE Decoder Tests ───────────────────────────────────

#[wasm_bindgen_test]
fn sse_decodes_split_frame() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"data: {\"chunk\":\"a").is_empty());
    let frames = decoder.feed(b"b\",\"isComplete\":true}\n\n");
    assert_eq!(frames.len(), 1);
    let frame = frames[0].as_ref().unwrap();
    assert_eq!(frame.chunk, "ab");
    assert!(frame.is_complete);
}
