//! Session model representing a named conversation on the backend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Message;

/// Title shown for sessions the backend returned without one.
pub const UNTITLED: &str = "Untitled";

/// Maximum number of characters kept in a session preview.
pub const PREVIEW_CHARS: usize = 60;

/// A conversation session as listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Server-assigned identifier.
    pub id: String,
    /// User-editable display name.
    pub title: String,
    /// Truncated text of the most recent message.
    #[serde(default)]
    pub preview: String,
    /// Client-only favorite flag.
    #[serde(default)]
    pub favorite: bool,
    /// Client-only tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl SessionSummary {
    /// Build a summary from a title and the session's messages.
    pub fn new(id: impl Into<String>, title: Option<String>, messages: &[Message]) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        Self {
            id: id.into(),
            title,
            preview: preview_of(messages),
            favorite: false,
            tags: BTreeSet::new(),
        }
    }
}

/// Derive the preview text from the last message.
pub fn preview_of(messages: &[Message]) -> String {
    let Some(last) = messages.last() else {
        return String::new();
    };
    let line = last.content.lines().next().unwrap_or_default().trim();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_becomes_untitled() {
        let s = SessionSummary::new("1", Some("   ".into()), &[]);
        assert_eq!(s.title, UNTITLED);
        let s = SessionSummary::new("1", None, &[]);
        assert_eq!(s.title, UNTITLED);
    }

    #[test]
    fn preview_is_last_message_first_line() {
        let msgs = vec![Message::user("first", Vec::new()), Message::assistant("second\nmore")];
        assert_eq!(preview_of(&msgs), "second");
    }

    #[test]
    fn preview_truncates_long_text() {
        let msgs = vec![Message::user("é".repeat(100), Vec::new())];
        let preview = preview_of(&msgs);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }
}
