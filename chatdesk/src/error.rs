//! Error type shared by the chat client core.

use thiserror::Error;

/// Result alias for chat client operations.
pub type Result<T, E = ChatError> = std::result::Result<T, E>;

/// Everything that can go wrong in the chat client core.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A response body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API base or a download link is not a usable URL.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Send attempted with no text and no files.
    #[error("nothing to send")]
    EmptyMessage,

    /// Another request is already in flight for this view.
    #[error("another request is still in progress")]
    Busy,

    #[error("no message at index {0}")]
    NoSuchMessage(usize),

    #[error("message at index {0} is not a user message")]
    NotUserMessage(usize),

    #[error("unknown message {0}")]
    UnknownMessage(String),

    #[error("unknown session {0}")]
    UnknownSession(String),

    /// The message has no artifact link.
    #[error("message {0} has nothing to download")]
    NoDownload(String),

    /// Input started with `/` but named no known command.
    #[error("unknown command {0}")]
    UnknownCommand(String),

    /// Reading or writing local files failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether the error came from talking to the backend.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }
}
