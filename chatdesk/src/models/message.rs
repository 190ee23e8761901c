//! Message model representing one turn in a conversation.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display format for the time a message was created.
pub const TIMESTAMP_FORMAT: &str = "%I:%M %p";

/// Calendar-day format used to group messages.
pub const DATE_KEY_FORMAT: &str = "%a %b %d %Y";

/// Opaque client-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user.
    User,
    /// Reply from the chat backend.
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a role from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" | "bot" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery status of a user message.
///
/// Ordered so that `Sent < Delivered < Read`; a status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Appended locally, request issued.
    Sent,
    /// The backend answered.
    Delivered,
    /// The answer finished revealing.
    Read,
}

impl DeliveryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Return the later of `self` and `next`.
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display classification of an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Reply contains code.
    Code,
    /// Plain answer.
    Answer,
    /// Generated document (ppt/pdf).
    Document,
    /// Resume scoring report.
    AtsReport,
}

impl MessageKind {
    /// Human label shown next to the message.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::Answer => "Answer",
            Self::Document => "Document",
            Self::AtsReport => "ATS Report",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// File name as shown to the user.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Media type, e.g. `application/pdf`.
    #[serde(default = "default_media_type")]
    pub media_type: String,
}

fn default_media_type() -> String {
    "application/octet-stream".to_string()
}

impl FileAttachment {
    /// Top-level media kind (`image`, `application`, ...).
    pub fn media_kind(&self) -> &str {
        self.media_type.split('/').next().unwrap_or_default()
    }

    pub fn is_image(&self) -> bool {
        self.media_kind() == "image"
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier, unchanged by edits.
    pub id: MessageId,
    /// Who sent the message.
    pub role: Role,
    /// Body for user messages, reply for assistant messages.
    pub content: String,
    /// Attached files (user messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileAttachment>,
    /// Link to a generated artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Display time.
    pub timestamp: String,
    /// Calendar day used for grouping.
    pub date_key: String,
    /// Message this one replies to. May dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// Display classification (assistant messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Delivery status (user messages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
}

impl Message {
    /// Create a user message with status `sent`.
    pub fn user(content: impl Into<String>, files: Vec<FileAttachment>) -> Self {
        Self::user_at(content, files, Local::now())
    }

    /// Create a user message stamped at `at`.
    pub fn user_at(
        content: impl Into<String>,
        files: Vec<FileAttachment>,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            files,
            download_url: None,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            date_key: at.format(DATE_KEY_FORMAT).to_string(),
            reply_to: None,
            kind: None,
            status: Some(DeliveryStatus::Sent),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_at(content, Local::now())
    }

    /// Create an assistant message stamped at `at`.
    pub fn assistant_at(content: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: content.into(),
            files: Vec::new(),
            download_url: None,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            date_key: at.format(DATE_KEY_FORMAT).to_string(),
            reply_to: None,
            kind: None,
            status: None,
        }
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: Option<MessageId>) -> Self {
        self.reply_to = reply_to;
        self
    }

    pub const fn is_user(&self) -> bool {
        matches!(self.role, Role::User)
    }

    pub const fn is_assistant(&self) -> bool {
        matches!(self.role, Role::Assistant)
    }

    /// Move the delivery status forward. Never moves it backward.
    pub fn advance_status(&mut self, next: DeliveryStatus) {
        if let Some(current) = self.status {
            self.status = Some(current.advance(next));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_never_moves_backward() {
        let mut msg = Message::user("hi", Vec::new());
        msg.advance_status(DeliveryStatus::Read);
        msg.advance_status(DeliveryStatus::Delivered);
        assert_eq!(msg.status, Some(DeliveryStatus::Read));
    }

    #[test]
    fn assistant_messages_have_no_status() {
        let mut msg = Message::assistant("hello");
        msg.advance_status(DeliveryStatus::Read);
        assert_eq!(msg.status, None);
    }

    #[test]
    fn stamps_time_and_date_key() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let msg = Message::user_at("x", Vec::new(), at);
        assert_eq!(msg.timestamp, "02:07 PM");
        assert_eq!(msg.date_key, "Tue Mar 05 2024");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn role_parses_wire_strings() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn attachment_media_kind() {
        let file = FileAttachment {
            name: "a.png".into(),
            size: 10,
            media_type: "image/png".into(),
        };
        assert!(file.is_image());
    }
}
