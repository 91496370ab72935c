//! Parser for quest completion reward text.
//!
//! The server does not (yet) send quest rewards as a structured field; the
//! amount is embedded in free text like:
//!
//! `Quest Complete: Fetch the silver chalice! You gain 12 experience.`
//!
//! This is a format-coupled boundary: the parser is deliberately narrow and
//! has an explicit failure path. When the text does not match, callers keep
//! the message but drop the XP annotation. The real fix is a structured
//! reward field on the server side.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker a quest completion message always carries.
pub const QUEST_COMPLETE_MARKER: &str = "Quest Complete:";

/// Integer token immediately preceding the word "experience".
static REWARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+experience").expect("invalid quest reward pattern"));

/// Whether a message is a quest completion notice.
pub fn is_quest_complete(text: &str) -> bool {
    text.contains(QUEST_COMPLETE_MARKER)
}

/// Extract the XP amount from quest completion text.
///
/// Returns `None` when the text does not carry a parseable `<n> experience`
/// token. Never panics.
pub fn parse_reward(text: &str) -> Option<u32> {
    let caps = REWARD_PATTERN.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}
