//! Typed decode of raw action payloads.
//!
//! The server tags events with a `caller` class name and leans on message
//! text for the rest. Rather than scattering substring checks through the
//! session reducer, everything is classified exactly once here, at the
//! protocol boundary, into a [`GameEvent`] variant. Downstream code matches
//! on the enum and never looks at raw wire fields again.

use log::warn;

use crate::frames::{ActorInfo, RawAction, RoomInfo};
use crate::quest;

/// Event class tag for a persona (re)assignment on spawn.
pub const CALLER_SOUL_SPAWN: &str = "SoulSpawnEvent";
/// Event class tag for a room description.
pub const CALLER_LOOK: &str = "LookEvent";
/// Event class tag for a spoken utterance.
pub const CALLER_SPEECH: &str = "SpeechEvent";
/// Event class tag for server-generated system notices.
pub const CALLER_SYSTEM: &str = "SystemMessageEvent";

/// Fixed substring the server puts in the echo of an utterance it could not
/// parse. Such an echo corrects the pending local message rather than
/// appending a new one.
pub const REJECTED_MARKER: &str = "incomprehensible";

/// A raw action, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The player's persona was (re)assigned. Replaces any prior persona
    /// wholesale.
    PersonaAssigned(Persona),

    /// The player's current room was described. Replaces any prior location
    /// wholesale.
    RoomDescribed(Location),

    /// XP reward backfill for a previously logged event.
    RewardGranted { target_event: String, amount: i64 },

    /// A quest completion notice. `xp` is `None` when the reward text did
    /// not parse; the message is still logged either way.
    QuestCompleted { xp: Option<u32> },

    /// The server rejected a previously sent utterance; corrects the pending
    /// entry with the matching correlation id.
    UtteranceRejected { event_id: String },

    /// Anything else: speech, movement, emotes, unclassified system text.
    /// Appended to the log verbatim.
    Generic,
}

/// The player's assigned character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    /// Display-name prefix ("a", "the", ...).
    pub prefix: String,
    pub description: String,
    pub xp: i64,
    /// Giftable XP balance.
    pub gift_xp: i64,
}

impl From<ActorInfo> for Persona {
    fn from(actor: ActorInfo) -> Self {
        Persona {
            id: actor.id,
            name: actor.name,
            prefix: actor.prefix,
            description: actor.description,
            xp: actor.xp,
            gift_xp: actor.giftxp,
        }
    }
}

/// The player's current room, with a display description synthesized from
/// the room text plus its visible objects and navigable exits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Location {
    /// Build a location from a room sub-document, folding the object and
    /// exit lists into the description.
    pub fn synthesize(room: RoomInfo) -> Self {
        let mut description = room.description.trim().to_string();
        if !room.objects.is_empty() {
            description.push_str(&format!("\nYou see: {}.", room.objects.join(", ")));
        }
        if !room.exits.is_empty() {
            description.push_str(&format!("\nYou can go: {}.", room.exits.join(", ")));
        }
        Location {
            id: room.id,
            name: room.name,
            description,
        }
    }
}

/// Classify a raw action payload.
///
/// Never fails: a malformed nested sub-document degrades the event to
/// [`GameEvent::Generic`] with a warning, so the message text still reaches
/// the log.
pub fn decode(action: &RawAction) -> GameEvent {
    match action.caller.as_str() {
        CALLER_SOUL_SPAWN => match action.actor_info() {
            Ok(Some(actor)) => return GameEvent::PersonaAssigned(actor.into()),
            Ok(None) => {
                warn!("spawn event without an actor sub-document");
            }
            Err(err) => {
                warn!("dropping persona assignment: {err}");
            }
        },
        CALLER_LOOK => match action.room_info() {
            Ok(Some(room)) => return GameEvent::RoomDescribed(Location::synthesize(room)),
            Ok(None) => {
                warn!("look event without a room sub-document");
            }
            Err(err) => {
                warn!("dropping room description: {err}");
            }
        },
        _ => {}
    }

    if action.text.contains(REJECTED_MARKER) {
        if let Some(event_id) = action.event_id.clone() {
            return GameEvent::UtteranceRejected { event_id };
        }
    }

    if action.caller == CALLER_SYSTEM && action.text.contains("XP") {
        if let (Some(target_event), Some(event_data)) =
            (action.target_event.clone(), action.event_data.as_ref())
        {
            return GameEvent::RewardGranted {
                target_event,
                amount: event_data.reward,
            };
        }
    }

    if quest::is_quest_complete(&action.text) {
        return GameEvent::QuestCompleted {
            xp: quest::parse_reward(&action.text),
        };
    }

    GameEvent::Generic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::EventData;

    fn action(caller: &str, text: &str) -> RawAction {
        RawAction {
            caller: caller.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_spawn_event_decodes_to_persona() {
        let mut a = action(CALLER_SOUL_SPAWN, "You are a weary traveler.");
        a.actor = Some(
            r#"{"id": "agent_7", "name": "weary traveler", "prefix": "a",
                "description": "Dusty boots, long road.", "xp": 40, "giftxp": 3}"#
                .to_string(),
        );

        match decode(&a) {
            GameEvent::PersonaAssigned(persona) => {
                assert_eq!(persona.name, "weary traveler");
                assert_eq!(persona.prefix, "a");
                assert_eq!(persona.xp, 40);
                assert_eq!(persona.gift_xp, 3);
            }
            other => panic!("expected PersonaAssigned, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_event_with_broken_actor_degrades_to_generic() {
        let mut a = action(CALLER_SOUL_SPAWN, "You are someone.");
        a.actor = Some("{broken".to_string());
        assert_eq!(decode(&a), GameEvent::Generic);
    }

    #[test]
    fn test_look_event_synthesizes_location() {
        let mut a = action(CALLER_LOOK, "");
        a.room = Some(
            r#"{"id": "r9", "name": "Old Cellar", "description": "Cold and damp.",
                "objects": ["a barrel", "a rat"], "exits": ["up the stairs"]}"#
                .to_string(),
        );

        match decode(&a) {
            GameEvent::RoomDescribed(loc) => {
                assert_eq!(loc.name, "Old Cellar");
                assert!(loc.description.contains("Cold and damp."));
                assert!(loc.description.contains("You see: a barrel, a rat."));
                assert!(loc.description.contains("You can go: up the stairs."));
            }
            other => panic!("expected RoomDescribed, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_utterance_with_event_id() {
        let mut a = action(CALLER_SYSTEM, "That was incomprehensible.");
        a.event_id = Some("e42".to_string());
        assert_eq!(
            decode(&a),
            GameEvent::UtteranceRejected {
                event_id: "e42".to_string()
            }
        );
    }

    #[test]
    fn test_rejected_marker_without_event_id_is_generic() {
        let a = action(CALLER_SYSTEM, "That was incomprehensible.");
        assert_eq!(decode(&a), GameEvent::Generic);
    }

    #[test]
    fn test_reward_event_decodes_target_and_amount() {
        let mut a = action(CALLER_SYSTEM, "You earned XP!");
        a.target_event = Some("e7".to_string());
        a.event_data = Some(EventData { reward: 5 });

        assert_eq!(
            decode(&a),
            GameEvent::RewardGranted {
                target_event: "e7".to_string(),
                amount: 5
            }
        );
    }

    #[test]
    fn test_reward_text_without_target_is_generic() {
        let a = action(CALLER_SYSTEM, "You earned XP!");
        assert_eq!(decode(&a), GameEvent::Generic);
    }

    #[test]
    fn test_quest_complete_with_parseable_reward() {
        let a = action(
            CALLER_SYSTEM,
            "Quest Complete: Fetch the chalice! You gain 12 experience.",
        );
        assert_eq!(decode(&a), GameEvent::QuestCompleted { xp: Some(12) });
    }

    #[test]
    fn test_quest_complete_with_malformed_reward_still_classifies() {
        let a = action(CALLER_SYSTEM, "Quest Complete: Fetch the chalice!");
        assert_eq!(decode(&a), GameEvent::QuestCompleted { xp: None });
    }

    #[test]
    fn test_speech_event_is_generic() {
        let a = action(CALLER_SPEECH, "hello there");
        assert_eq!(decode(&a), GameEvent::Generic);
    }
}
