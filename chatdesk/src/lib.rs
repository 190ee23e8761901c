//! Core of a web chat client.
//!
//! - [`render`] turns message text into safe markup.
//! - [`store`] keeps the ordered conversation and its local mirror.
//! - [`reveal`] plays replies back one character at a time.
//! - [`directory`] lists, searches and organises sessions.
//! - [`view`] ties them together behind [`view::ChatView`].
//! - [`api`] talks to the backend over HTTP.

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod render;
pub mod reveal;
pub mod store;
pub mod view;

pub use api::{ChatApi, HttpChatApi};
pub use config::Config;
pub use error::{ChatError, Result};
pub use view::ChatView;
