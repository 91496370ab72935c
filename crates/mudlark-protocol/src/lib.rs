//! Canonical wire protocol types for the Mudlark game socket.
//!
//! The game server speaks newline-free JSON text frames over a WebSocket.
//! This crate owns both directions of that protocol:
//!
//! - [`commands`]: frames the client sends (`act`, `hb`)
//! - [`frames`]: frames the server pushes (`actions`, `fail_find`)
//! - [`events`]: the typed decode step that turns a raw action payload into
//!   a [`events::GameEvent`] variant, so downstream code dispatches on an
//!   enum instead of scanning message text
//! - [`quest`]: the isolated free-text parser for quest completion rewards

pub mod commands;
pub mod events;
pub mod frames;
pub mod quest;

pub use commands::{ActPayload, ClientCommand};
pub use events::{GameEvent, Location, Persona, decode};
pub use frames::{ActorInfo, EventData, RawAction, RoomInfo, ServerFrame};

use thiserror::Error;

/// Errors produced while decoding server traffic.
///
/// A conforming client logs and drops on these; a malformed frame must never
/// take the session down.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text frame was not valid JSON or did not match any known shape.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// A nested JSON-string sub-document (room, actor) failed to parse.
    #[error("malformed {field} sub-document: {source}")]
    MalformedSubDocument {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
