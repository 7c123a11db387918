//! Browser runtime: tasks on the JS microtask queue, timers via `setTimeout`.

use gloo_timers::future::TimeoutFuture;
use news_core::ports::{LocalBoxFuture, RuntimePort};

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserRuntime;

impl BrowserRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl RuntimePort for BrowserRuntime {
    fn spawn(&self, task: LocalBoxFuture) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, ms: u64) -> LocalBoxFuture {
        let ms = u32::try_from(ms).unwrap_or(u32::MAX);
        Box::pin(TimeoutFuture::new(ms))
    }
}
