//! Writing sessions and single replies to disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::models::{Message, Role, UNTITLED};
use crate::render::{escape_html, render_message};

/// File name used for single-message downloads, before the extension.
const RESPONSE_STEM: &str = "response";

/// Format of a single-message download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Txt,
    Html,
}

impl MessageFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Html => "html",
        }
    }
}

/// Make a session title safe to use as a file name.
pub fn file_stem(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned
    }
}

/// The messages as a pretty-printed JSON array.
pub fn session_json(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string_pretty(messages)?)
}

fn avatar(role: Role, user_name: Option<&str>) -> String {
    match role {
        Role::Assistant => "AI".to_string(),
        Role::User => user_name
            .and_then(|n| n.trim().chars().next())
            .map_or_else(|| "U".to_string(), |c| c.to_uppercase().collect()),
    }
}

/// A standalone HTML page holding the whole conversation.
pub fn session_html(title: &str, messages: &[Message], user_name: Option<&str>) -> String {
    let title = escape_html(title);
    let mut body = String::new();
    for message in messages {
        body.push_str(&format!(
            "<section class=\"message {role}\">\n<p class=\"meta\"><span class=\"avatar\">{avatar}</span> <strong>{role}</strong> <time>{date} {time}</time></p>\n{content}\n</section>\n",
            role = message.role.as_str(),
            avatar = escape_html(&avatar(message.role, user_name)),
            date = escape_html(&message.date_key),
            time = escape_html(&message.timestamp),
            content = render_message(&message.content),
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n"
    )
}

/// Write `<title>.json` and `<title>.html` into `dir`.
pub fn export_session(
    dir: &Path,
    title: &str,
    messages: &[Message],
    user_name: Option<&str>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let stem = file_stem(title);

    let json_path = dir.join(format!("{stem}.json"));
    std::fs::write(&json_path, session_json(messages)?)?;

    let html_path = dir.join(format!("{stem}.html"));
    std::fs::write(&html_path, session_html(title, messages, user_name))?;

    info!(path = %json_path.display(), messages = messages.len(), "exported session");
    Ok(vec![json_path, html_path])
}

/// Write one message to `response.txt` or `response.html` in `dir`.
pub fn download_message(dir: &Path, message: &Message, format: MessageFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{RESPONSE_STEM}.{}", format.extension()));
    match format {
        MessageFormat::Txt => std::fs::write(&path, &message.content)?,
        MessageFormat::Html => std::fs::write(
            &path,
            session_html(RESPONSE_STEM, std::slice::from_ref(message), None),
        )?,
    }
    info!(path = %path.display(), "downloaded response");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_become_safe_file_names() {
        assert_eq!(file_stem("Plans: Q3/Q4"), "Plans_ Q3_Q4");
        assert_eq!(file_stem("  ..  "), UNTITLED);
        assert_eq!(file_stem(""), UNTITLED);
    }

    #[test]
    fn export_writes_json_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let messages = vec![
            Message::user("<b>hi</b>", Vec::new()),
            Message::assistant("**hello**"),
        ];
        let paths = export_session(dir.path(), "Greetings", &messages, Some("ada")).unwrap();
        assert_eq!(paths[0], dir.path().join("Greetings.json"));

        let json = std::fs::read_to_string(&paths[0]).unwrap();
        let back: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, messages);

        let html = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(html.contains("<title>Greetings</title>"));
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(html.contains("<strong>hello</strong>"));
        assert!(html.contains(r#"<span class="avatar">A</span>"#));
    }

    #[test]
    fn message_download_uses_response_name() {
        let dir = tempfile::tempdir().unwrap();
        let message = Message::assistant("plain answer");
        let path = download_message(dir.path(), &message, MessageFormat::Txt).unwrap();
        assert_eq!(path, dir.path().join("response.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "plain answer");

        let path = download_message(dir.path(), &message, MessageFormat::Html).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("plain answer"));
    }
}
