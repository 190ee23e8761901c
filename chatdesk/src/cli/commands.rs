//! CLI command execution.
//!
//! Every command builds one [`ChatView`] over HTTP, runs, and prints what
//! changed. State carries over between runs through the local mirror.

use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use chatdesk::api::{HttpChatApi, UploadFile};
use chatdesk::config::Config;
use chatdesk::directory::SearchHit;
use chatdesk::models::{Message, MessageId};
use chatdesk::render::render_message;
use chatdesk::view::{ChatView, MessageFormat, NoticeLevel};

use super::args::{Cli, Commands, DownloadKind, ShowFormat};

type View = ChatView<HttpChatApi>;

/// Label printed for messages the backend stored without a date.
const UNDATED: &str = "Earlier";

/// Build the config: file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(base) = &cli.api_base {
        config.api_base.clone_from(base);
    }
    if let Some(state) = &cli.state {
        config.state_path = Some(state.clone());
    }
    if let Some(ms) = cli.reveal_ms {
        config.reveal_interval_ms = ms;
    }
    Ok(config)
}

/// Execute the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if let Commands::Render { file } = &cli.command {
        return render_file(file.as_deref());
    }

    let api = HttpChatApi::new(&config).context("Failed to build HTTP client")?;
    let download_dir = config.resolved_download_dir();
    let mut view = ChatView::new(api, config);

    let result = match cli.command {
        Commands::List => list_sessions(&mut view).await,
        Commands::Search { query } => search_sessions(&mut view, &query).await,
        Commands::Show { id, format } => {
            load_session(&mut view, id.as_deref()).await?;
            print_conversation(&view, format)
        }
        Commands::Send {
            session,
            files,
            reply_to,
            no_stream,
            message,
        } => {
            load_session(&mut view, session.as_deref()).await?;
            let uploads = files
                .iter()
                .map(|p| {
                    UploadFile::from_path(p).with_context(|| format!("Failed to read {}", p.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            if let Some(id) = reply_to {
                view.set_reply_to(Some(MessageId::from(id)))?;
            }
            view.send(&message.join(" "), uploads)
                .await
                .context("Failed to send message")?;
            show_reply(&mut view, no_stream).await
        }
        Commands::Regenerate { index, session } => {
            load_session(&mut view, session.as_deref()).await?;
            view.regenerate(index)
                .await
                .context("Failed to regenerate response")?;
            show_reply(&mut view, false).await
        }
        Commands::Edit {
            index,
            session,
            message,
        } => {
            load_session(&mut view, session.as_deref()).await?;
            view.edit_and_resend(index, &message.join(" "))
                .await
                .context("Failed to update message")?;
            show_reply(&mut view, false).await
        }
        Commands::New => {
            let id = view.new_session().await.context("Failed to create session")?;
            println!("Created session {id}");
            Ok(())
        }
        Commands::Select { id } => select_session(&mut view, &id).await,
        Commands::Rename { id, title } => {
            view.rename_session(&id, &title.join(" "))
                .await
                .context("Failed to rename session")?;
            Ok(())
        }
        Commands::Delete { id } => {
            view.delete_session(&id)
                .await
                .context("Failed to delete session")?;
            Ok(())
        }
        Commands::DeleteAll { yes } => {
            if !yes {
                bail!("Refusing to delete every session without --yes");
            }
            view.delete_all().await.context("Failed to delete sessions")?;
            Ok(())
        }
        Commands::DeleteMessage { message_id } => {
            load_session(&mut view, None).await?;
            view.delete_message(&MessageId::from(message_id))
                .await
                .context("Failed to delete message")?;
            Ok(())
        }
        Commands::Favorite { id } => {
            view.refresh_sessions().await?;
            let favorite = view.toggle_favorite(&id)?;
            println!(
                "{id} {}",
                if favorite { "is now a favorite" } else { "is no longer a favorite" }
            );
            Ok(())
        }
        Commands::Tag { id, tag, remove } => {
            view.refresh_sessions().await?;
            let changed = if remove {
                view.remove_tag(&id, &tag)?
            } else {
                view.add_tag(&id, &tag)?
            };
            if !changed {
                println!("Nothing changed.");
            }
            Ok(())
        }
        Commands::React { message_id, emoji } => {
            load_session(&mut view, None).await?;
            view.react(&MessageId::from(message_id), &emoji)?;
            Ok(())
        }
        Commands::Pin { message_id } => {
            load_session(&mut view, None).await?;
            let pinned = view.toggle_pin(&MessageId::from(message_id))?;
            println!("{}", if pinned { "Pinned." } else { "Unpinned." });
            Ok(())
        }
        Commands::Export { session, out } => {
            load_session(&mut view, session.as_deref()).await?;
            let dir = out.unwrap_or(download_dir);
            for path in view.export_session(&dir)? {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Download {
            message_id,
            kind,
            out,
        } => {
            load_session(&mut view, None).await?;
            let dir = out.unwrap_or(download_dir);
            let path = download(&mut view, &MessageId::from(message_id), kind, &dir).await?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Chat { session } => chat(&mut view, session.as_deref()).await,
        Commands::Render { .. } => Ok(()),
    };

    print_toasts(&mut view);
    result
}

/// Make `id` active, or reload the active session when `id` is `None`.
async fn load_session(view: &mut View, id: Option<&str>) -> Result<()> {
    let target = id.or(view.active_session_id()).map(str::to_string);
    if let Some(target) = target {
        view.select_session(&target)
            .await
            .with_context(|| format!("Failed to load session {target}"))?;
    }
    Ok(())
}

async fn select_session(view: &mut View, id: &str) -> Result<()> {
    let selected = match id {
        "next" | "prev" => {
            view.refresh_sessions().await?;
            let selected = if id == "next" {
                view.select_next().await?
            } else {
                view.select_previous().await?
            };
            let Some(selected) = selected else {
                println!("No more sessions.");
                return Ok(());
            };
            selected
        }
        _ => {
            view.select_session(id).await?;
            id.to_string()
        }
    };
    println!("Active session: {selected}");
    Ok(())
}

async fn list_sessions(view: &mut View) -> Result<()> {
    view.refresh_sessions()
        .await
        .context("Failed to load sessions")?;
    let sessions = view.directory().display_order();
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!("{:<2} {:<26} {:<28} {}", "", "ID", "TITLE", "PREVIEW");
    println!("{}", "-".repeat(80));
    for session in sessions {
        let marker = if view.active_session_id() == Some(session.id.as_str()) {
            ">"
        } else if session.favorite {
            "*"
        } else {
            ""
        };
        let tags = if session.tags.is_empty() {
            String::new()
        } else {
            let joined: Vec<_> = session.tags.iter().map(String::as_str).collect();
            format!(" [{}]", joined.join(", "))
        };
        println!(
            "{:<2} {:<26} {:<28} {}{tags}",
            marker,
            truncate(&session.id, 26),
            truncate(&session.title, 28),
            session.preview,
        );
    }
    Ok(())
}

async fn search_sessions(view: &mut View, query: &str) -> Result<()> {
    view.refresh_sessions()
        .await
        .context("Failed to load sessions")?;
    let hits = view.directory().search(query);
    if hits.is_empty() {
        println!("No sessions match \"{query}\".");
        return Ok(());
    }
    let color = std::io::stdout().is_terminal();
    for hit in hits {
        println!("{:<26} {}", hit.session.id, highlight_title(&hit, color));
    }
    Ok(())
}

/// Title with matches in bold yellow on a terminal, bracketed otherwise.
fn highlight_title(hit: &SearchHit<'_>, color: bool) -> String {
    let (open, close) = if color {
        ("\x1b[1;33m", "\x1b[0m")
    } else {
        ("[", "]")
    };
    let title = &hit.session.title;
    let mut out = String::new();
    let mut last = 0;
    for span in &hit.spans {
        out.push_str(&title[last..span.start]);
        out.push_str(open);
        out.push_str(&title[span.clone()]);
        out.push_str(close);
        last = span.end;
    }
    out.push_str(&title[last..]);
    out
}

fn print_conversation(view: &View, format: ShowFormat) -> Result<()> {
    if view.messages().is_empty() {
        println!("No messages.");
        return Ok(());
    }
    match format {
        ShowFormat::Json => {
            println!("{}", serde_json::to_string_pretty(view.messages())?);
        }
        ShowFormat::Html => {
            for message in view.messages() {
                println!("{}", render_message(&message.content));
            }
        }
        ShowFormat::Text => {
            for group in view.conversation().grouped_by_date() {
                let day = if group.date_key.is_empty() {
                    UNDATED
                } else {
                    group.date_key
                };
                println!("--- {day} ---");
                for (index, message) in group.entries {
                    print_message(view, index, message);
                }
            }
        }
    }
    Ok(())
}

fn print_message(view: &View, index: usize, message: &Message) {
    let mut header = format!(
        "[{index}] {} {}",
        message.role.as_str().to_uppercase(),
        message.timestamp
    );
    if let Some(status) = message.status {
        header.push_str(&format!(" ({})", status.as_str()));
    }
    if let Some(kind) = message.kind {
        header.push_str(&format!(" <{}>", kind.label()));
    }
    if view.annotations().is_pinned(&message.id) {
        header.push_str(" pinned");
    }
    println!("{header}  id={}", message.id);

    if let Some(reply_to) = &message.reply_to {
        println!("  replying to {reply_to}");
    }
    for file in &message.files {
        println!("  file: {} ({} bytes, {})", file.name, file.size, file.media_type);
    }
    println!("{}", message.content);
    if let Some(url) = &message.download_url {
        println!("  download: {url}");
    }
    let reactions = view.annotations().reactions_for(&message.id);
    if !reactions.is_empty() {
        println!("  {}", reactions.join(" "));
    }
    println!();
}

/// Print the reply being revealed, or all of it at once.
async fn show_reply(view: &mut View, no_stream: bool) -> Result<()> {
    if no_stream {
        view.skip_reveals();
        if let Some(last) = view.messages().last().filter(|m| m.is_assistant()) {
            println!("{}", last.content);
        }
        return Ok(());
    }
    stream_reveals(view).await
}

async fn stream_reveals(view: &mut View) -> Result<()> {
    let mut out = std::io::stdout();
    let mut open_line = false;
    while let Some(frame) = view.next_reveal().await {
        if !frame.delta.is_empty() {
            write!(out, "{}", frame.delta)?;
            out.flush()?;
            open_line = true;
        }
        if frame.done && open_line {
            writeln!(out)?;
            open_line = false;
        }
    }
    Ok(())
}

async fn download(
    view: &mut View,
    id: &MessageId,
    kind: DownloadKind,
    dir: &Path,
) -> Result<PathBuf> {
    let path = match kind {
        DownloadKind::Txt => view.download_message(id, MessageFormat::Txt, dir)?,
        DownloadKind::Html => view.download_message(id, MessageFormat::Html, dir)?,
        DownloadKind::Artifact => view.download_artifact(id, dir).await?,
    };
    Ok(path)
}

fn render_file(file: Option<&Path>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    println!("{}", render_message(&input));
    Ok(())
}

/// Read lines from stdin and send them until EOF or `:q`.
async fn chat(view: &mut View, session: Option<&str>) -> Result<()> {
    load_session(view, session).await?;
    match view.active_session_id() {
        Some(id) => println!("Session {id}. Type :help for commands."),
        None => println!("New conversation. Type :help for commands."),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim_end();

        let outcome = match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => Ok(()),
            (":q" | ":quit", _) => break,
            (":help", _) => {
                print_chat_help();
                Ok(())
            }
            (":show", _) => print_conversation(view, ShowFormat::Text),
            (":next", _) => select_session(view, "next").await,
            (":prev", _) => select_session(view, "prev").await,
            (":suggest", partial) => {
                for suggestion in view.autocomplete(partial) {
                    println!("  {suggestion}");
                }
                Ok(())
            }
            (":regen", index) => match index.trim().parse() {
                Ok(index) => match view.regenerate(index).await {
                    Ok(()) => stream_reveals(view).await,
                    Err(e) => Err(e.into()),
                },
                Err(_) => Err(anyhow::anyhow!("usage: :regen <index>")),
            },
            _ => match view.send(line, Vec::new()).await {
                Ok(()) => stream_reveals(view).await,
                Err(e) => Err(e.into()),
            },
        };

        if let Err(e) = outcome {
            eprintln!("error: {e:#}");
            view.notices_mut().dismiss_banner();
        }
        print_toasts(view);
    }
    Ok(())
}

fn print_chat_help() {
    println!("  <text>            send a message");
    println!("  /reset            delete every session");
    println!("  /download         save the last message as response.txt");
    println!("  /summary          ask for a summary");
    println!("  :show             print the conversation");
    println!("  :regen <index>    ask again for the answer to a message");
    println!("  :next, :prev      switch session");
    println!("  :suggest <text>   complete a command or earlier message");
    println!("  :q                quit");
}

/// Print pending success toasts. Errors reach the user as returned errors.
fn print_toasts(view: &mut View) {
    for toast in view.notices_mut().drain_toasts() {
        if toast.level == NoticeLevel::Success {
            eprintln!("{}", toast.text);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk::models::SessionSummary;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn titles_bracket_matches_without_color() {
        let session = SessionSummary::new("1", Some("Rust and rustaceans".into()), &[]);
        let hit = SearchHit {
            session: &session,
            spans: vec![0..4, 9..13],
        };
        assert_eq!(highlight_title(&hit, false), "[Rust] and [rust]aceans");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base":"http://file/api","reveal_interval_ms":9}"#).unwrap();
        let cli = <Cli as clap::Parser>::parse_from([
            "chatdesk",
            "--config",
            path.to_str().unwrap(),
            "--reveal-ms",
            "0",
            "list",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.reveal_interval_ms, 0);
    }
}
