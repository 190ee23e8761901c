//! Data models for chat sessions and messages.

mod message;
mod session;

pub use message::{
    DeliveryStatus, FileAttachment, Message, MessageId, MessageKind, Role, DATE_KEY_FORMAT,
    TIMESTAMP_FORMAT,
};
pub use session::{preview_of, SessionSummary, PREVIEW_CHARS, UNTITLED};
