//! Insertion-ordered message log keyed by correlation id.
//!
//! The chat display needs receipt order; reward backfill and rejection
//! corrections need O(1) lookup by correlation id. A `Vec` of ids alongside
//! a `HashMap` of entries gives both. Entries are never reordered and never
//! deleted; patching replaces an entry in place under its existing id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One logged chat line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Correlation id. Taken from the wire event when present, otherwise a
    /// freshly generated uuid so every entry is addressable.
    pub id: String,
    /// Event class tag this line came from.
    pub caller: String,
    /// Display name of the speaking/acting agent, when known.
    pub author: Option<String>,
    pub text: String,
    /// True for the player's own lines (local echo and server echo).
    pub is_self: bool,
    /// XP attached to this line, from a quest notice or a reward backfill.
    pub xp: Option<u32>,
    pub quest_complete: bool,
    pub received_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message, generating a correlation id when the wire had none.
    pub fn new(id: Option<String>, caller: impl Into<String>, text: impl Into<String>) -> Self {
        ChatMessage {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            caller: caller.into(),
            author: None,
            text: text.into(),
            is_self: false,
            xp: None,
            quest_complete: false,
            received_at: Utc::now(),
        }
    }
}

/// The ordered message log.
#[derive(Debug, Default)]
pub struct MessageLog {
    order: Vec<String>,
    entries: HashMap<String, ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. If the id is already present the entry is replaced
    /// in place and keeps its original position (the server echo of a
    /// pending self message reuses its correlation id).
    pub fn push(&mut self, message: ChatMessage) {
        if !self.entries.contains_key(&message.id) {
            self.order.push(message.id.clone());
        }
        self.entries.insert(message.id.clone(), message);
    }

    /// Patch the entry with the given id in place. Returns the patched
    /// message, or `None` when no entry matches (position is unchanged
    /// either way).
    pub fn patch<F>(&mut self, id: &str, f: F) -> Option<&ChatMessage>
    where
        F: FnOnce(&mut ChatMessage),
    {
        let entry = self.entries.get_mut(id)?;
        f(entry);
        Some(entry)
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Messages in receipt order.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, text: &str) -> ChatMessage {
        ChatMessage::new(Some(id.to_string()), "SpeechEvent", text)
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut log = MessageLog::new();
        log.push(msg("a", "first"));
        log.push(msg("b", "second"));
        log.push(msg("c", "third"));

        let texts: Vec<&str> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_push_with_known_id_replaces_in_place() {
        let mut log = MessageLog::new();
        log.push(msg("a", "first"));
        log.push(msg("b", "second"));
        log.push(msg("a", "first, corrected"));

        assert_eq!(log.len(), 2);
        let texts: Vec<&str> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first, corrected", "second"]);
    }

    #[test]
    fn test_patch_updates_one_entry_only() {
        let mut log = MessageLog::new();
        log.push(msg("a", "first"));
        log.push(msg("b", "second"));

        let patched = log.patch("a", |m| m.xp = Some(5));
        assert_eq!(patched.unwrap().xp, Some(5));
        assert_eq!(log.get("b").unwrap().xp, None);
    }

    #[test]
    fn test_patch_unknown_id_is_a_no_op() {
        let mut log = MessageLog::new();
        log.push(msg("a", "first"));
        assert!(log.patch("zzz", |m| m.xp = Some(5)).is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_message_without_wire_id_gets_one() {
        let m = ChatMessage::new(None, "SpeechEvent", "hello");
        assert!(!m.id.is_empty());
    }
}
