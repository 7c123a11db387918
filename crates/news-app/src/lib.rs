//! News chat app: WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the browser adapters and exposes the chat client to
//! JavaScript as `NewsChatClient`.

mod client;

pub use client::NewsChatClient;

use wasm_bindgen::prelude::*;

/// WASM entry point, runs when the module is instantiated
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("News chat client v{} loaded", env!("CARGO_PKG_VERSION"));
}
