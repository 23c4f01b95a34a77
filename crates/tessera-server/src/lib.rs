//! HTTP endpoint and live envelope updates for tessera.
//!
//! Serves the root component's markup, stores envelopes in named slots and
//! pushes slot changes to WebSocket subscribers.

pub mod components;
pub mod data;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use components::{client_counter, demo_registry, server_panel};
pub use data::{ServerData, ServerItem};
pub use server::{render_root, router, AppServer, AppState, ServerConfig, ServerError};
pub use watcher::{SlotEvent, SlotWatcher};
pub use websocket::{EnvelopeHub, SlotMessage};
