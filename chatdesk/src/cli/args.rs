//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// chatdesk - talk to a chat backend from the terminal
#[derive(Parser, Debug)]
#[command(name = "chatdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to <config dir>/chatdesk/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the chat API, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Location of the local state file
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Delay between revealed characters, in milliseconds
    #[arg(long, global = true)]
    pub reveal_ms: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sessions (favorites last)
    List,

    /// Find sessions by title
    Search {
        /// Text to look for, case-insensitive
        query: String,
    },

    /// Show the messages of a session
    Show {
        /// Session ID (defaults to the active session)
        id: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = ShowFormat::Text)]
        format: ShowFormat,
    },

    /// Send a message and print the reply
    Send {
        /// Session to send to (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,

        /// Files to upload with the message
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// ID of the message this one replies to
        #[arg(long)]
        reply_to: Option<String>,

        /// Print the reply at once instead of revealing it
        #[arg(long)]
        no_stream: bool,

        /// Message text
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Ask again for the answer to a user message
    Regenerate {
        /// Position of the user message, as shown by `show`
        index: usize,

        /// Session ID (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Edit a user message and ask again
    Edit {
        /// Position of the user message, as shown by `show`
        index: usize,

        /// Session ID (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,

        /// New message text
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Start a new session and make it active
    New,

    /// Make a session active
    Select {
        /// Session ID, or `next` / `prev`
        id: String,
    },

    /// Rename a session
    Rename {
        /// Session ID
        id: String,

        /// New title
        #[arg(trailing_var_arg = true, required = true)]
        title: Vec<String>,
    },

    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },

    /// Delete every session
    DeleteAll {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Delete one message from the active session
    DeleteMessage {
        /// Message ID
        message_id: String,
    },

    /// Toggle the favorite flag of a session
    Favorite {
        /// Session ID
        id: String,
    },

    /// Add or remove a session tag
    Tag {
        /// Session ID
        id: String,

        /// Tag text
        tag: String,

        /// Remove the tag instead of adding it
        #[arg(long)]
        remove: bool,
    },

    /// React to a message with an emoji
    React {
        /// Message ID
        message_id: String,

        /// Emoji to add
        emoji: String,
    },

    /// Toggle the pin on a message
    Pin {
        /// Message ID
        message_id: String,
    },

    /// Export the active session as JSON and HTML
    Export {
        /// Session ID (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,

        /// Output directory (defaults to the download directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Save a message or the file it links to
    Download {
        /// Message ID
        message_id: String,

        /// What to save
        #[arg(long, value_enum, default_value_t = DownloadKind::Txt)]
        kind: DownloadKind,

        /// Output directory (defaults to the download directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render markdown from a file (or stdin) to HTML
    Render {
        /// Input file
        file: Option<PathBuf>,
    },

    /// Interactive chat on the active session
    Chat {
        /// Session ID (defaults to the active session)
        #[arg(short, long)]
        session: Option<String>,
    },
}

/// How `show` prints messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    /// Plain text grouped by day
    Text,
    /// Rendered HTML fragments
    Html,
    /// Raw JSON
    Json,
}

/// What `download` saves
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DownloadKind {
    /// The message as response.txt
    Txt,
    /// The message as response.html
    Html,
    /// The file linked from the message
    Artifact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_collects_message_and_files() {
        let cli = Cli::parse_from([
            "chatdesk", "send", "-f", "a.pdf", "--file", "b.png", "hello", "there",
        ]);
        match cli.command {
            Commands::Send { files, message, .. } => {
                assert_eq!(files.len(), 2);
                assert_eq!(message.join(" "), "hello there");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["chatdesk", "list", "--api-base", "http://x/api", "-v"]);
        assert_eq!(cli.api_base.as_deref(), Some("http://x/api"));
        assert!(cli.verbose);
    }
}
