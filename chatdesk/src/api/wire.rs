//! Request and response bodies of the chat backend.
//!
//! Everything coming off the wire is decoded into these structs first and
//! then converted into `models` types, dropping records that do not fit.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryStatus, FileAttachment, Message, MessageId, Role};

/// `GET /chats`
#[derive(Debug, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<WireSession>,
}

/// A session as listed by the backend.
#[derive(Debug, Deserialize)]
pub struct WireSession {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// `GET /chats/{id}`
#[derive(Debug, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// `POST /chats`
#[derive(Debug, Deserialize)]
pub struct CreatedSession {
    pub chat_id: String,
}

/// Error body returned alongside a failure status.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.reply)
    }
}

/// A file reference stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFile {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, alias = "type")]
    pub media_type: Option<String>,
}

/// A message as stored by the backend.
///
/// User turns carry `message`, assistant turns carry `reply`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default, alias = "timestamp")]
    pub time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub file: Option<WireFile>,
    #[serde(default)]
    pub files: Vec<WireFile>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, rename = "replyTo")]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
}

impl WireMessage {
    /// Convert into a message, or `None` if the role cannot be determined.
    pub fn into_message(self) -> Option<Message> {
        let role = match self.role.as_deref() {
            Some(r) => Role::parse(r)?,
            None if self.reply.is_some() => Role::Assistant,
            None if self.message.is_some() => Role::User,
            None => return None,
        };

        let content = match role {
            Role::User => self.message.or(self.reply),
            Role::Assistant => self.reply.or(self.message),
        }
        .unwrap_or_default();

        let files = self
            .file
            .into_iter()
            .chain(self.files)
            .map(|f| FileAttachment {
                media_type: f
                    .media_type
                    .unwrap_or_else(|| guess_media_type(Path::new(&f.name)).to_string()),
                name: f.name,
                size: f.size.unwrap_or_default(),
            })
            .collect();

        let kind = matches!(role, Role::Assistant).then(|| super::classify_text(&content));
        let status = match role {
            Role::User => Some(self.status.unwrap_or(DeliveryStatus::Read)),
            Role::Assistant => None,
        };

        Some(Message {
            id: self.id.map_or_else(MessageId::generate, MessageId::from),
            role,
            content,
            files,
            download_url: self.download_url,
            timestamp: self.time.unwrap_or_default(),
            date_key: self.date.unwrap_or_default(),
            reply_to: self.reply_to.map(MessageId::from),
            kind,
            status,
        })
    }
}

/// Convert wire messages, dropping the ones that cannot be interpreted.
pub fn convert_messages(messages: Vec<WireMessage>) -> Vec<Message> {
    let total = messages.len();
    let converted: Vec<Message> = messages
        .into_iter()
        .filter_map(WireMessage::into_message)
        .collect();
    if converted.len() < total {
        tracing::warn!(
            dropped = total - converted.len(),
            "ignored messages without a usable role"
        );
    }
    converted
}

/// A session with its messages, after validation.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    pub id: String,
    pub title: Option<String>,
    pub messages: Vec<Message>,
}

impl From<WireSession> for RemoteSession {
    fn from(s: WireSession) -> Self {
        Self {
            id: s.id,
            title: s.title,
            messages: convert_messages(s.messages),
        }
    }
}

/// A file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub attachment: FileAttachment,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Read a file from disk, guessing its media type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());
        Ok(Self {
            attachment: FileAttachment {
                name,
                size: bytes.len() as u64,
                media_type: guess_media_type(path).to_string(),
            },
            bytes,
        })
    }
}

/// Best-effort media type from a file extension.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" | "md" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub chat_id: Option<String>,
    pub reply_to: Option<MessageId>,
    pub files: Vec<UploadFile>,
}

/// JSON form of [`ChatRequest`] when no files are attached.
#[derive(Debug, Serialize)]
pub struct ChatJsonBody<'a> {
    pub message: &'a str,
    pub chat_id: Option<&'a str>,
    #[serde(rename = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<&'a str>,
}

impl ChatRequest {
    pub fn json_body(&self) -> ChatJsonBody<'_> {
        ChatJsonBody {
            message: &self.message,
            chat_id: self.chat_id.as_deref(),
            reply_to: self.reply_to.as_ref().map(MessageId::as_str),
        }
    }
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}
