//! Chat engine for the news assistant client.
//!
//! Platform-free: everything that touches the browser sits behind the
//! traits in [`ports`] and is injected by the app crate.

pub mod ports;
pub mod event_bus;
pub mod transport;
pub mod assembly;
pub mod store;
pub mod session;
pub mod controller;
pub mod client;
pub mod sse;
