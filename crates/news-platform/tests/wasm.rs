//! WASM-target tests for news-platform (Node.js runtime).
//!
//! Tests MemoryStorage and BrowserRuntime under wasm32-unknown-unknown
//! via `wasm-pack test --node`.
//!
//! localStorage, fetch and WebSocket need a browser and a running backend.

use wasm_bindgen_test::*;

use news_core::ports::{RuntimePort, StoragePort};
use news_platform::storage::MemoryStorage;
use news_platform::BrowserRuntime;
use std::cell::Cell;
use std::rc::Rc;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    let result = storage.get("news_chat_session_id").await.unwrap();
    assert!(result.is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_set_and_get() {
    let storage = MemoryStorage::new();
    storage.set("news_chat_session_id", "abc-123").await.unwrap();
    let result = storage.get("news_chat_session_id").await.unwrap();
    assert_eq!(result.as_deref(), Some("abc-123"));
}

#[wasm_bindgen_test]
async fn memory_storage_overwrite() {
    let storage = MemoryStorage::new();
    storage.set("key", "v1").await.unwrap();
    storage.set("key", "v2").await.unwrap();
    assert_eq!(storage.get("key").await.unwrap().as_deref(), Some("v2"));
}

#[wasm_bindgen_test]
async fn memory_storage_delete() {
    let storage = MemoryStorage::new();
    storage.set("key", "val").await.unwrap();
    storage.delete("key").await.unwrap();
    assert!(storage.get("key").await.unwrap().is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_delete_nonexistent() {
    let storage = MemoryStorage::new();
    storage.delete("nonexistent").await.unwrap();
}

#[wasm_bindgen_test]
async fn memory_storage_as_trait_object() {
    let storage: Rc<dyn StoragePort> = Rc::new(MemoryStorage::new());
    storage.set("k", "v").await.unwrap();
    assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
}

// ─── BrowserRuntime Tests ────────────────────────────────

#[wasm_bindgen_test]
async fn runtime_sleep_resolves() {
    let runtime = BrowserRuntime::new();
    runtime.sleep(5).await;
}

#[wasm_bindgen_test]
async fn runtime_spawned_task_runs() {
    let runtime = BrowserRuntime::new();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    runtime.spawn(Box::pin(async move { flag.set(true) }));
    runtime.sleep(10).await;
    assert!(ran.get());
}
