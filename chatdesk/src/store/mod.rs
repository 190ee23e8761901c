//! Conversation state and its local mirror.

mod conversation;
mod mirror;

pub use conversation::{Annotations, Conversation, DateGroup};
pub use mirror::{LocalMirror, MirrorState};
