//! Mudlark - a terminal client for a crowdsourced text-adventure game server.
//!
//! The library half of the crate: session state, the WebSocket client task,
//! and settings. The `mudlark` binary in `main.rs` is a thin CLI over these.

pub mod client;
pub mod session;
pub mod settings;

pub use client::{ClientConfig, ClientError, GameClient};
pub use session::{ChatMessage, ConnectionState, SessionState, SessionUpdate};
