//! Slash commands and input suggestions.

use std::str::FromStr;

use crate::error::ChatError;
use crate::models::Message;

/// Prompt sent by `/summary`.
pub const SUMMARY_PROMPT: &str = "Please summarize the conversation.";

/// Every command, as typed.
pub const COMMANDS: [&str; 3] = ["/reset", "/download", "/summary"];

/// Most earlier messages offered as suggestions.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    /// Delete every session.
    Reset,
    /// Save the last message as text.
    Download,
    /// Ask for a summary of the conversation.
    Summary,
}

impl SlashCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "/reset",
            Self::Download => "/download",
            Self::Summary => "/summary",
        }
    }

    /// Whether `input` should be routed as a command instead of sent.
    pub fn is_command(input: &str) -> bool {
        input.trim_start().starts_with('/')
    }
}

impl FromStr for SlashCommand {
    type Err = ChatError;

    /// Parse `/name [args...]`. Arguments are ignored and the name is
    /// case-insensitive.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let name = input
            .trim()
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match name.as_str() {
            "reset" => Ok(Self::Reset),
            "download" => Ok(Self::Download),
            "summary" => Ok(Self::Summary),
            _ => Err(ChatError::UnknownCommand(input.trim().to_string())),
        }
    }
}

/// Completions for the text being typed.
///
/// Command input completes command names by prefix. Other input longer than
/// one character suggests earlier user messages containing it.
pub fn suggestions(input: &str, history: &[Message]) -> Vec<String> {
    if SlashCommand::is_command(input) {
        let typed = input.trim_start().to_lowercase();
        return COMMANDS
            .iter()
            .filter(|c| c.starts_with(&typed))
            .map(|c| (*c).to_string())
            .collect();
    }

    if input.chars().count() <= 1 {
        return Vec::new();
    }
    let needle = input.to_lowercase();
    history
        .iter()
        .filter(|m| m.is_user() && !m.content.is_empty())
        .filter(|m| m.content.to_lowercase().contains(&needle))
        .map(|m| m.content.clone())
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!("/reset".parse::<SlashCommand>().unwrap(), SlashCommand::Reset);
        assert_eq!(" /Download now".parse::<SlashCommand>().unwrap(), SlashCommand::Download);
        assert_eq!("/summary".parse::<SlashCommand>().unwrap(), SlashCommand::Summary);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = "/frobnicate".parse::<SlashCommand>().unwrap_err();
        assert!(matches!(err, ChatError::UnknownCommand(c) if c == "/frobnicate"));
    }

    #[test]
    fn command_names_complete_by_prefix() {
        assert_eq!(suggestions("/", &[]), COMMANDS.map(String::from).to_vec());
        assert_eq!(suggestions("/D", &[]), vec!["/download".to_string()]);
        assert!(suggestions("/x", &[]).is_empty());
    }

    #[test]
    fn history_suggestions_are_user_messages_only() {
        let mut history: Vec<Message> = (0..8)
            .map(|i| Message::user(format!("Tell me about Rust {i}"), Vec::new()))
            .collect();
        history.insert(0, Message::assistant("rust is great"));
        let found = suggestions("rust", &history);
        assert_eq!(found.len(), MAX_SUGGESTIONS);
        assert_eq!(found[0], "Tell me about Rust 0");
        assert!(suggestions("r", &history).is_empty());
    }
}
