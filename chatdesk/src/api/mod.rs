//! Remote chat backend: wire types, reply decoding and the HTTP client.

mod client;
mod reply;
mod wire;

pub use client::{ChatApi, HttpChatApi};
pub use reply::{classify_text, DocumentFormat, ReplyPayload, NO_REPLY};
pub use wire::{
    convert_messages, guess_media_type, ChatRequest, ChatResponse, RemoteSession, UploadFile,
    WireMessage,
};
