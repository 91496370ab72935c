//! Live game session state.
//!
//! [`SessionState`] is the single-consumer reducer behind one game socket:
//! the client task feeds it decoded server frames and it maintains the
//! ordered message log plus the derived player context (persona, location,
//! present-agent roster). It is fully synchronous; the client task
//! serializes all mutation, so there is no locking here.

mod log;

use std::collections::HashMap;
use std::fmt;

use ::log::{debug, warn};

use mudlark_protocol::events::{self, GameEvent, Location, Persona};
use mudlark_protocol::frames::{RawAction, ServerFrame};
use mudlark_protocol::ClientCommand;

pub use self::log::{ChatMessage, MessageLog};

/// Connection state of the session, as surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempted, or explicitly parked by the client.
    Idle,
    Connecting,
    Connected,
    /// The socket errored or closed. Not retried automatically; reconnection
    /// is the caller's responsibility.
    Errored,
    /// The server reported no open player slot. Terminal for this attempt.
    WorldFull,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn is_errored(self) -> bool {
        self == ConnectionState::Errored
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Errored => write!(f, "errored"),
            ConnectionState::WorldFull => write!(f, "world full"),
        }
    }
}

/// One observable change to the session, emitted for the UI to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(ConnectionState),
    /// A message was appended to the log.
    Message(ChatMessage),
    /// A previously logged message was rewritten in place.
    MessagePatched(ChatMessage),
    Persona(Persona),
    Location(Location),
}

/// State of one live game session.
#[derive(Debug)]
pub struct SessionState {
    status: ConnectionState,
    log: MessageLog,
    persona: Option<Persona>,
    location: Option<Location>,
    roster: HashMap<String, String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            status: ConnectionState::Idle,
            log: MessageLog::new(),
            persona: None,
            location: None,
            roster: HashMap::new(),
        }
    }

    pub fn status(&self) -> ConnectionState {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn is_errored(&self) -> bool {
        self.status().is_errored()
    }

    pub fn is_world_full(&self) -> bool {
        self.status() == ConnectionState::WorldFull
    }

    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Agent id -> display name for agents seen in the current room. Merged
    /// on every update; stale entries persist until superseded.
    pub fn roster(&self) -> &HashMap<String, String> {
        &self.roster
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.log.iter()
    }

    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    // ------------------------------------------------------------------
    // Connection lifecycle (local flips; the socket lives in the client)
    // ------------------------------------------------------------------

    pub fn mark_connecting(&mut self) -> SessionUpdate {
        self.set_status(ConnectionState::Connecting)
    }

    pub fn mark_connected(&mut self) -> SessionUpdate {
        self.set_status(ConnectionState::Connected)
    }

    pub fn mark_errored(&mut self) -> SessionUpdate {
        self.set_status(ConnectionState::Errored)
    }

    pub fn mark_idle(&mut self) -> SessionUpdate {
        self.set_status(ConnectionState::Idle)
    }

    fn set_status(&mut self, status: ConnectionState) -> SessionUpdate {
        self.status = status;
        SessionUpdate::Status(status)
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Apply one server frame, returning the updates it produced in order.
    pub fn apply_frame(&mut self, frame: ServerFrame) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        match frame {
            ServerFrame::Actions { data } => {
                for action in &data {
                    self.apply_action(action, &mut updates);
                }
            }
            ServerFrame::FailFind => {
                updates.push(self.set_status(ConnectionState::WorldFull));
            }
            ServerFrame::Unknown => {
                debug!("ignoring unrecognized server frame");
            }
        }
        updates
    }

    fn apply_action(&mut self, action: &RawAction, updates: &mut Vec<SessionUpdate>) {
        if let Some(agents) = &action.room_agents {
            for (id, name) in agents {
                self.roster.insert(id.clone(), name.clone());
            }
        }

        match events::decode(action) {
            GameEvent::PersonaAssigned(persona) => {
                self.persona = Some(persona.clone());
                updates.push(SessionUpdate::Persona(persona));
                self.append(Self::message_from(action), updates);
            }
            GameEvent::RoomDescribed(location) => {
                let mut message = Self::message_from(action);
                if message.text.is_empty() {
                    message.text = location.description.clone();
                }
                self.location = Some(location.clone());
                updates.push(SessionUpdate::Location(location));
                self.append(message, updates);
            }
            GameEvent::RewardGranted {
                target_event,
                amount,
            } => {
                let patched = self.log.patch(&target_event, |entry| {
                    let current = i64::from(entry.xp.unwrap_or(0));
                    let next = current.saturating_add(amount).clamp(0, i64::from(u32::MAX));
                    entry.xp = Some(next as u32);
                });
                match patched {
                    Some(entry) => updates.push(SessionUpdate::MessagePatched(entry.clone())),
                    None => {
                        // Reward for an event we never logged; inapplicable.
                        debug!("reward backfill for unknown event {target_event}");
                    }
                }
            }
            GameEvent::UtteranceRejected { event_id } => {
                if self.log.contains(&event_id) {
                    let text = action.text.clone();
                    let caller = action.caller.clone();
                    let patched = self.log.patch(&event_id, |entry| {
                        entry.text = text;
                        entry.caller = caller;
                    });
                    if let Some(entry) = patched {
                        updates.push(SessionUpdate::MessagePatched(entry.clone()));
                    }
                } else {
                    // Correction to a message we never sent; keep the text
                    // as an ordinary line rather than losing it.
                    warn!("rejection for unknown event {event_id}");
                    self.append(Self::message_from(action), updates);
                }
            }
            GameEvent::QuestCompleted { xp } => {
                let mut message = Self::message_from(action);
                message.quest_complete = true;
                message.xp = xp;
                self.append(message, updates);
            }
            GameEvent::Generic => {
                self.append(Self::message_from(action), updates);
            }
        }
    }

    fn append(&mut self, message: ChatMessage, updates: &mut Vec<SessionUpdate>) {
        updates.push(SessionUpdate::Message(message.clone()));
        self.log.push(message);
    }

    fn message_from(action: &RawAction) -> ChatMessage {
        let mut message = ChatMessage::new(
            action.event_id.clone(),
            action.caller.clone(),
            action.text.clone(),
        );
        message.is_self = action.is_self;
        // Speech and emote events carry the speaking agent; parse failures
        // here only cost the author annotation.
        message.author = action
            .actor_info()
            .ok()
            .flatten()
            .map(|actor| actor.name)
            .filter(|name| !name.is_empty());
        message
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Record an utterance the player just typed and build the `act` command
    /// to transmit. The local echo is appended immediately under the same
    /// correlation id the server will answer with.
    pub fn submit_utterance(&mut self, text: &str) -> (ClientCommand, SessionUpdate) {
        let command = ClientCommand::act(text);
        let event_id = command
            .event_id()
            .map(str::to_string)
            .unwrap_or_default();

        let mut message = ChatMessage::new(Some(event_id), events::CALLER_SPEECH, text);
        message.is_self = true;
        if let Some(persona) = &self.persona {
            message.author = Some(persona.name.clone());
        }

        let update = SessionUpdate::Message(message.clone());
        self.log.push(message);
        (command, update)
    }
}
