//! Decoding of the `reply` field returned by `POST /chat`.
//!
//! The backend sometimes sends plain text and sometimes a JSON document with
//! a `type` discriminator. Decoding never fails: anything that is not a
//! recognised document is plain text.

use serde_json::Value;

use crate::models::MessageKind;

/// Shown when the backend answered without a reply.
pub const NO_REPLY: &str = "\u{26a0}\u{fe0f} No reply.";

/// Document formats the backend can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Ppt,
    Pdf,
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// Resume scoring result.
    Ats { score: String, feedback: String },
    /// Generated document, shown as the raw reply.
    Document { format: DocumentFormat, raw: String },
    /// JSON document carrying a `code` field.
    Code { raw: String },
    /// Anything else.
    Plain(String),
}

impl ReplyPayload {
    /// Decode a raw reply string.
    pub fn decode(raw: &str) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
            return Self::Plain(raw.to_string());
        };

        match map.get("type").and_then(Value::as_str) {
            Some("ats") => Self::Ats {
                score: map.get("score").map(scalar_text).unwrap_or_default(),
                feedback: map.get("feedback").map(scalar_text).unwrap_or_default(),
            },
            Some("ppt") => Self::Document {
                format: DocumentFormat::Ppt,
                raw: raw.to_string(),
            },
            Some("pdf") => Self::Document {
                format: DocumentFormat::Pdf,
                raw: raw.to_string(),
            },
            _ if map.contains_key("code") => Self::Code {
                raw: raw.to_string(),
            },
            _ => Self::Plain(raw.to_string()),
        }
    }

    /// Text placed in the assistant message.
    pub fn display_text(&self) -> String {
        match self {
            Self::Ats { score, feedback } => format!("ATS Score: {score}/100\nFeedback: {feedback}"),
            Self::Document { raw, .. } | Self::Code { raw } | Self::Plain(raw) => raw.clone(),
        }
    }

    /// Display classification for the message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Ats { .. } => MessageKind::AtsReport,
            Self::Document { .. } => MessageKind::Document,
            Self::Code { .. } => MessageKind::Code,
            Self::Plain(raw) => classify_text(raw),
        }
    }
}

/// Classify free text: fenced code makes it `Code`, otherwise `Answer`.
pub fn classify_text(text: &str) -> MessageKind {
    if text.contains("```") {
        MessageKind::Code
    } else {
        MessageKind::Answer
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_stays_plain() {
        let reply = ReplyPayload::decode("hello there");
        assert_eq!(reply, ReplyPayload::Plain("hello there".into()));
        assert_eq!(reply.kind(), MessageKind::Answer);
    }

    #[test]
    fn fenced_plain_text_is_code() {
        let reply = ReplyPayload::decode("```rs\nfn x() {}\n```");
        assert_eq!(reply.kind(), MessageKind::Code);
    }

    #[test]
    fn ats_reply_is_reformatted() {
        let reply = ReplyPayload::decode(r#"{"type":"ats","score":82,"feedback":"Add metrics"}"#);
        assert_eq!(reply.kind(), MessageKind::AtsReport);
        assert_eq!(reply.display_text(), "ATS Score: 82/100\nFeedback: Add metrics");
    }

    #[test]
    fn documents_pass_through() {
        let raw = r#"{"type":"pdf","title":"Report"}"#;
        let reply = ReplyPayload::decode(raw);
        assert_eq!(reply.kind(), MessageKind::Document);
        assert_eq!(reply.display_text(), raw);
    }

    #[test]
    fn code_documents() {
        let reply = ReplyPayload::decode(r#"{"code":"print(1)"}"#);
        assert_eq!(reply.kind(), MessageKind::Code);
    }

    #[test]
    fn json_scalars_are_plain() {
        assert_eq!(ReplyPayload::decode("42"), ReplyPayload::Plain("42".into()));
        assert_eq!(ReplyPayload::decode(r#"{"type":"other"}"#).kind(), MessageKind::Answer);
    }
}
