//! Frames pushed from the game server to the client.
//!
//! The server multiplexes everything over two frame shapes: an `actions`
//! batch carrying zero or more raw action payloads, and a `fail_find` signal
//! meaning no player slot was available. Unknown `command` tags decode to
//! [`ServerFrame::Unknown`] so new server-side frame types never break old
//! clients.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Frames the game server pushes to the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A batch of game events, in the order they happened server-side.
    Actions { data: Vec<RawAction> },

    /// The world has no open player slot. Terminal for this attempt.
    FailFind,

    /// Any frame tag this client does not understand. Dropped without error.
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Parse a raw text frame off the socket.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One raw action payload, exactly as it arrives on the wire.
///
/// Everything here is optional because the server populates fields per event
/// class. The `actor` and `room` sub-documents arrive JSON-*string* encoded
/// and are parsed lazily via [`RawAction::actor_info`] / [`RawAction::room_info`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAction {
    /// Event class tag, e.g. `"SpeechEvent"`, `"LookEvent"`.
    #[serde(default)]
    pub caller: String,

    /// Display text of the event.
    #[serde(default)]
    pub text: String,

    /// Correlation id of this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Correlation id of a previously delivered event this one amends
    /// (XP reward backfill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_event: Option<String>,

    /// JSON-string encoded actor sub-document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// JSON-string encoded room sub-document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Agent id -> display name for agents present in the room. Merged into
    /// the client roster, never replacing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_agents: Option<HashMap<String, String>>,

    /// Structured extras, currently only the XP reward amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<EventData>,

    /// True on the server echo of the player's own utterance.
    #[serde(default)]
    pub is_self: bool,
}

impl RawAction {
    /// Parse the nested actor sub-document, if present.
    pub fn actor_info(&self) -> Result<Option<ActorInfo>, ProtocolError> {
        self.actor
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|source| ProtocolError::MalformedSubDocument {
                    field: "actor",
                    source,
                })
            })
            .transpose()
    }

    /// Parse the nested room sub-document, if present.
    pub fn room_info(&self) -> Result<Option<RoomInfo>, ProtocolError> {
        self.room
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|source| ProtocolError::MalformedSubDocument {
                    field: "room",
                    source,
                })
            })
            .transpose()
    }
}

/// Structured extras attached to system events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    /// XP amount granted by a reward event.
    #[serde(default)]
    pub reward: i64,
}

/// The actor sub-document: the character an event concerns, or the player's
/// assigned persona on a spawn event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Display-name prefix ("a", "the", ...).
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub xp: i64,
    /// Giftable XP balance.
    #[serde(default)]
    pub giftxp: i64,
}

/// The room sub-document carried by room description events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Names of objects visible in the room.
    #[serde(default)]
    pub objects: Vec<String>,
    /// Navigable exit labels.
    #[serde(default)]
    pub exits: Vec<String>,
}
