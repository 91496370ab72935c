//! Commands sent from client to server over the game socket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames the client sends to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// A player utterance or game command.
    Act { data: ActPayload },

    /// Heartbeat/keepalive frame, sent on a fixed interval while connected.
    Hb { data: HbPayload },
}

impl ClientCommand {
    /// Build an `act` command with a freshly generated correlation id.
    pub fn act(text: impl Into<String>) -> Self {
        ClientCommand::Act {
            data: ActPayload {
                text: text.into(),
                event_id: Uuid::new_v4().to_string(),
            },
        }
    }

    /// Build a heartbeat frame.
    pub fn heartbeat() -> Self {
        ClientCommand::Hb { data: HbPayload {} }
    }

    /// Correlation id of an `act` command, if any.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            ClientCommand::Act { data } => Some(&data.event_id),
            ClientCommand::Hb { .. } => None,
        }
    }
}

/// Payload of an `act` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActPayload {
    /// The raw text the player typed.
    pub text: String,
    /// Client-generated correlation id. The server echoes it back, which is
    /// how a pending local message gets matched to its confirmation or to a
    /// parse-failure correction.
    pub event_id: String,
}

/// Heartbeat payload. Serializes as an empty object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HbPayload {}
