//! The chat view controller.
//!
//! [`ChatView`] owns the visible conversation, the session directory, the
//! running reveals and the local mirror. The backend is injected through
//! [`ChatApi`] so tests can swap it for a fake.
//!
//! Every failure is recorded as a toast and in the banner before it is
//! returned to the caller. Every mutation rewrites the mirror.

pub mod commands;
pub mod export;
pub mod notices;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use commands::{suggestions, SlashCommand, COMMANDS, MAX_SUGGESTIONS, SUMMARY_PROMPT};
pub use export::MessageFormat;
pub use notices::{NoticeLevel, Notices, Toast};

use crate::api::{ChatApi, ChatRequest, ChatResponse, ReplyPayload, UploadFile, NO_REPLY};
use crate::config::Config;
use crate::directory::{SessionDirectory, NEW_CHAT_MESSAGE};
use crate::error::{ChatError, Result};
use crate::models::{preview_of, DeliveryStatus, Message, MessageId, UNTITLED};
use crate::reveal::{Presenter, RevealFrame};
use crate::store::{Annotations, Conversation, LocalMirror, MirrorState};

/// Assistant text appended when a send fails.
pub const ERROR_REPLY: &str = "\u{26a0}\u{fe0f} Error contacting server.";

/// A reply being revealed into an assistant message.
#[derive(Debug)]
struct PendingReveal {
    /// The complete reply.
    full: String,
    /// User message marked read once the reveal completes.
    marks_read: Option<MessageId>,
}

pub struct ChatView<A> {
    api: A,
    config: Config,
    conversation: Conversation,
    directory: SessionDirectory,
    presenter: Presenter,
    mirror: LocalMirror,
    annotations: Annotations,
    active_session_id: Option<String>,
    reply_to: Option<MessageId>,
    notices: Notices,
    revealing: HashMap<MessageId, PendingReveal>,
}

impl<A: ChatApi> ChatView<A> {
    /// Build a view, rehydrating from the local mirror when one exists.
    ///
    /// Must be called inside a tokio runtime before any reveal starts.
    pub fn new(api: A, config: Config) -> Self {
        let mirror = LocalMirror::new(config.resolved_state_path());
        let state = match mirror.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(path = %mirror.path().display(), error = %e, "could not read chat state");
                MirrorState::default()
            }
        };
        debug!(
            sessions = state.sessions.len(),
            messages = state.messages.len(),
            "restored chat state"
        );

        Self {
            presenter: Presenter::new(config.reveal_interval()),
            notices: Notices::new(config.toast_ttl()),
            directory: SessionDirectory::from_sessions(state.sessions),
            conversation: Conversation::from_messages(state.messages),
            annotations: state.annotations,
            active_session_id: state.active_session_id,
            reply_to: None,
            revealing: HashMap::new(),
            api,
            config,
            mirror,
        }
    }

    // === Accessors ===

    pub const fn api(&self) -> &A {
        &self.api
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub const fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub const fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub const fn reply_to(&self) -> Option<&MessageId> {
        self.reply_to.as_ref()
    }

    pub const fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Whether a reply is still being revealed. New requests are refused
    /// until it completes.
    pub fn is_busy(&self) -> bool {
        self.presenter.has_active()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            Err(ChatError::Busy)
        } else {
            Ok(())
        }
    }

    // === Sending ===

    /// Send user input.
    ///
    /// Input starting with `/` runs a slash command instead. The reply is
    /// revealed afterwards; drive it with [`Self::next_reveal`].
    pub async fn send(&mut self, text: &str, files: Vec<UploadFile>) -> Result<()> {
        if text.trim().is_empty() && files.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if files.is_empty() && SlashCommand::is_command(text) {
            return self.run_command(text).await;
        }
        self.send_message(text, files).await
    }

    async fn send_message(&mut self, text: &str, files: Vec<UploadFile>) -> Result<()> {
        self.ensure_idle()?;

        let attachments = files.iter().map(|f| f.attachment.clone()).collect();
        let reply_to = self.reply_to.clone();
        let user = Message::user(text, attachments).with_reply_to(reply_to.clone());
        let user_id = user.id.clone();
        self.conversation.push(user);
        self.persist();

        let request = ChatRequest {
            message: text.to_string(),
            chat_id: self.active_session_id.clone(),
            reply_to,
            files,
        };
        let response = match self.api.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.conversation.push(Message::assistant(ERROR_REPLY));
                self.persist();
                return Err(self.fail("Failed to send message", e));
            }
        };

        self.reply_to = None;
        self.conversation
            .advance_status(&user_id, DeliveryStatus::Delivered);
        if let Some(chat_id) = &response.chat_id {
            self.active_session_id = Some(chat_id.clone());
        }

        let (payload, download_url) = decode_response(response);
        let mut assistant = Message::assistant(String::new());
        assistant.kind = Some(payload.kind());
        assistant.download_url = download_url;
        let assistant_id = assistant.id.clone();
        self.conversation.push(assistant);
        self.start_reveal(assistant_id, payload.display_text(), Some(user_id));
        self.persist();

        self.notices.success("Message sent successfully!");
        self.refresh_quietly().await;
        Ok(())
    }

    /// Re-issue the user message at `index` and replace its answer.
    pub async fn regenerate(&mut self, index: usize) -> Result<()> {
        self.ensure_idle()?;
        let text = self.user_message_at(index)?.content.clone();
        self.reissue(index, text, "Failed to regenerate response")
            .await?;
        self.notices.success("Response regenerated successfully!");
        Ok(())
    }

    /// Re-issue the user message at `index` with new text.
    ///
    /// The message keeps its id and position. Its text is only replaced once
    /// the backend answers; a failed request leaves the conversation as it
    /// was.
    pub async fn edit_and_resend(&mut self, index: usize, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.ensure_idle()?;
        let id = self.user_message_at(index)?.id.clone();

        self.reissue(index, text.to_string(), "Failed to update message")
            .await?;
        self.conversation.set_content(&id, text);
        self.persist();
        self.notices.success("Message updated successfully!");
        self.refresh_quietly().await;
        Ok(())
    }

    fn user_message_at(&self, index: usize) -> Result<&Message> {
        let message = self
            .conversation
            .get(index)
            .ok_or(ChatError::NoSuchMessage(index))?;
        if message.is_user() {
            Ok(message)
        } else {
            Err(ChatError::NotUserMessage(index))
        }
    }

    /// Send `text` again and reveal the reply into the first assistant
    /// message after `index`, or a new one.
    async fn reissue(&mut self, index: usize, text: String, failure: &str) -> Result<()> {
        let request = ChatRequest {
            message: text,
            chat_id: self.active_session_id.clone(),
            ..ChatRequest::default()
        };
        let response = match self.api.send(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(failure, e)),
        };
        if let Some(chat_id) = &response.chat_id {
            self.active_session_id = Some(chat_id.clone());
        }

        let (payload, download_url) = decode_response(response);
        let kind = payload.kind();
        let paired = self
            .conversation
            .paired_assistant(index)
            .and_then(|i| self.conversation.get(i))
            .map(|m| m.id.clone());
        let target = match paired {
            Some(id) => {
                self.conversation.update(&id, |m| {
                    m.kind = Some(kind);
                    m.download_url = download_url;
                });
                id
            }
            None => {
                let mut assistant = Message::assistant(String::new());
                assistant.kind = Some(kind);
                assistant.download_url = download_url;
                let id = assistant.id.clone();
                self.conversation.push(assistant);
                id
            }
        };
        self.start_reveal(target, payload.display_text(), None);
        self.persist();
        Ok(())
    }

    // === Reveal ===

    fn start_reveal(&mut self, id: MessageId, full: String, marks_read: Option<MessageId>) {
        self.conversation.update(&id, |m| m.content.clear());
        self.presenter.start(id.clone(), full.clone());
        self.revealing.insert(id, PendingReveal { full, marks_read });
    }

    /// Wait for the next reveal step and apply it to the conversation.
    ///
    /// Returns `None` once nothing is being revealed.
    pub async fn next_reveal(&mut self) -> Option<RevealFrame> {
        let frame = self.presenter.next_frame().await?;
        if !frame.delta.is_empty() {
            self.conversation
                .update(&frame.message_id, |m| m.content.push_str(&frame.delta));
        }
        if frame.done {
            self.complete_reveal(&frame.message_id);
        }
        Some(frame)
    }

    /// Drive every running reveal to completion.
    pub async fn finish_reveals(&mut self) {
        while self.next_reveal().await.is_some() {}
    }

    /// Complete every running reveal at once.
    pub fn skip_reveals(&mut self) {
        self.presenter.cancel_all();
        let ids: Vec<_> = self.revealing.keys().cloned().collect();
        for id in ids {
            self.complete_reveal(&id);
        }
    }

    fn complete_reveal(&mut self, id: &MessageId) {
        if let Some(pending) = self.revealing.remove(id) {
            self.conversation.set_content(id, &pending.full);
            if let Some(user_id) = pending.marks_read {
                self.conversation.advance_status(&user_id, DeliveryStatus::Read);
            }
        }
        if let Some(active) = &self.active_session_id {
            self.directory
                .set_preview(active, preview_of(self.conversation.messages()));
        }
        self.persist();
    }

    /// Abandon running reveals, leaving their messages as they stand.
    fn cancel_reveals(&mut self) {
        self.presenter.cancel_all();
        self.revealing.clear();
    }

    // === Sessions ===

    /// Reload the session list.
    pub async fn refresh_sessions(&mut self) -> Result<()> {
        if let Err(e) = self.directory.refresh(&self.api).await {
            return Err(self.fail("Failed to load chats", e));
        }
        self.persist();
        Ok(())
    }

    async fn refresh_quietly(&mut self) {
        match self.directory.refresh(&self.api).await {
            Ok(()) => self.persist(),
            Err(e) => warn!(error = %e, "could not refresh sessions"),
        }
    }

    /// Make `id` the active session and load its messages.
    pub async fn select_session(&mut self, id: &str) -> Result<()> {
        let messages = match self.api.fetch_messages(id).await {
            Ok(messages) => messages,
            Err(e) => return Err(self.fail("Failed to load chat", e)),
        };
        self.cancel_reveals();
        self.reply_to = None;
        self.conversation.replace_all(messages);
        self.active_session_id = Some(id.to_string());
        self.persist();
        info!(session = %id, messages = self.conversation.len(), "selected session");
        Ok(())
    }

    /// Select the session after the active one in display order.
    ///
    /// Returns the newly selected id, or `None` at the end of the list.
    pub async fn select_next(&mut self) -> Result<Option<String>> {
        self.select_adjacent(true).await
    }

    pub async fn select_previous(&mut self) -> Result<Option<String>> {
        self.select_adjacent(false).await
    }

    async fn select_adjacent(&mut self, forward: bool) -> Result<Option<String>> {
        let Some(target) = self
            .directory
            .neighbor(self.active_session_id.as_deref(), forward)
            .map(|s| s.id.clone())
        else {
            return Ok(None);
        };
        self.select_session(&target).await?;
        Ok(Some(target))
    }

    /// Start a new session on the backend and make it active.
    pub async fn new_session(&mut self) -> Result<String> {
        let id = match self.directory.create(&self.api, NEW_CHAT_MESSAGE).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail("Failed to create new chat", e)),
        };
        self.cancel_reveals();
        self.reply_to = None;
        self.conversation.clear();
        self.active_session_id = Some(id.clone());
        self.persist();
        Ok(id)
    }

    pub async fn rename_session(&mut self, id: &str, title: &str) -> Result<()> {
        if let Err(e) = self.directory.rename(&self.api, id, title).await {
            return Err(self.fail("Failed to rename session", e));
        }
        self.persist();
        self.notices.success("Session renamed successfully!");
        Ok(())
    }

    /// Delete a session; clears the view if it was the active one.
    pub async fn delete_session(&mut self, id: &str) -> Result<()> {
        if let Err(e) = self.directory.delete(&self.api, id).await {
            return Err(self.fail("Failed to delete session", e));
        }
        if self.active_session_id.as_deref() == Some(id) {
            self.clear_active();
        }
        self.refresh_quietly().await;
        self.persist();
        self.notices.success("Chat session deleted successfully!");
        Ok(())
    }

    pub async fn delete_all(&mut self) -> Result<()> {
        if let Err(e) = self.directory.delete_all(&self.api).await {
            return Err(self.fail("Failed to clear all chats", e));
        }
        self.clear_active();
        self.persist();
        self.notices.success("All chats cleared successfully!");
        Ok(())
    }

    fn clear_active(&mut self) {
        self.cancel_reveals();
        self.reply_to = None;
        self.conversation.clear();
        self.active_session_id = None;
    }

    pub fn toggle_favorite(&mut self, session_id: &str) -> Result<bool> {
        let favorite = self.directory.toggle_favorite(session_id)?;
        self.persist();
        Ok(favorite)
    }

    pub fn add_tag(&mut self, session_id: &str, tag: &str) -> Result<bool> {
        let added = self.directory.add_tag(session_id, tag)?;
        self.persist();
        Ok(added)
    }

    pub fn remove_tag(&mut self, session_id: &str, tag: &str) -> Result<bool> {
        let removed = self.directory.remove_tag(session_id, tag)?;
        self.persist();
        Ok(removed)
    }

    // === Messages ===

    fn require_message(&self, id: &MessageId) -> Result<&Message> {
        self.conversation
            .find(id)
            .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))
    }

    /// Remove one message locally and, when a session is active, remotely.
    pub async fn delete_message(&mut self, id: &MessageId) -> Result<()> {
        self.require_message(id)?;
        if let Some(session) = self.active_session_id.clone() {
            if let Err(e) = self.api.delete_message(&session, id).await {
                return Err(self.fail("Failed to delete message", e));
            }
        }
        self.presenter.cancel(id);
        self.revealing.remove(id);
        self.conversation.remove(id);
        self.annotations.forget(id);
        if self.reply_to.as_ref() == Some(id) {
            self.reply_to = None;
        }
        self.persist();
        self.notices.success("Message deleted.");
        Ok(())
    }

    pub fn react(&mut self, id: &MessageId, emoji: &str) -> Result<()> {
        self.require_message(id)?;
        self.annotations.react(id, emoji);
        self.persist();
        Ok(())
    }

    /// Flip the pin on a message; returns whether it is now pinned.
    pub fn toggle_pin(&mut self, id: &MessageId) -> Result<bool> {
        self.require_message(id)?;
        let pinned = self.annotations.toggle_pin(id);
        self.persist();
        Ok(pinned)
    }

    /// Set the message the next send replies to.
    pub fn set_reply_to(&mut self, id: Option<MessageId>) -> Result<()> {
        if let Some(id) = &id {
            self.require_message(id)?;
        }
        self.reply_to = id;
        Ok(())
    }

    /// Completions for the text being typed.
    pub fn autocomplete(&self, input: &str) -> Vec<String> {
        suggestions(input, self.conversation.messages())
    }

    // === Files ===

    /// Fetch the artifact linked from a message into `dir`.
    pub async fn download_artifact(&mut self, id: &MessageId, dir: &Path) -> Result<PathBuf> {
        let url = self
            .require_message(id)?
            .download_url
            .clone()
            .ok_or_else(|| ChatError::NoDownload(id.to_string()))?;
        let bytes = match self.api.download(&url).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail("Failed to download file", e)),
        };
        let path = dir.join(artifact_file_name(&url));
        let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, &bytes));
        if let Err(e) = written {
            return Err(self.fail("Failed to save file", e.into()));
        }
        info!(path = %path.display(), bytes = bytes.len(), "downloaded artifact");
        self.notices.success("File downloaded successfully!");
        Ok(path)
    }

    /// Write the active conversation as `<title>.json` and `<title>.html`.
    pub fn export_session(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let title = self
            .active_session_id
            .as_deref()
            .and_then(|id| self.directory.get(id))
            .map_or(UNTITLED, |s| s.title.as_str())
            .to_string();
        let messages = self.settled_messages();
        match export::export_session(dir, &title, &messages, self.config.user_name.as_deref()) {
            Ok(paths) => {
                self.notices.success("Session exported successfully!");
                Ok(paths)
            }
            Err(e) => Err(self.fail("Failed to export session", e)),
        }
    }

    /// Write one message to `response.<ext>` in `dir`.
    pub fn download_message(
        &mut self,
        id: &MessageId,
        format: MessageFormat,
        dir: &Path,
    ) -> Result<PathBuf> {
        let mut message = self.require_message(id)?.clone();
        if let Some(pending) = self.revealing.get(id) {
            message.content.clone_from(&pending.full);
        }
        match export::download_message(dir, &message, format) {
            Ok(path) => {
                self.notices.success(format!(
                    "Response downloaded as {}!",
                    format.extension().to_uppercase()
                ));
                Ok(path)
            }
            Err(e) => Err(self.fail("Failed to download response", e)),
        }
    }

    // === Commands ===

    async fn run_command(&mut self, input: &str) -> Result<()> {
        let command = match input.parse::<SlashCommand>() {
            Ok(command) => command,
            Err(e) => {
                self.notices.error("Unknown command.");
                return Err(e);
            }
        };
        debug!(command = command.as_str(), "running slash command");
        match command {
            SlashCommand::Reset => self.delete_all().await,
            SlashCommand::Download => {
                let Some(last) = self.conversation.last().map(|m| m.id.clone()) else {
                    return Ok(());
                };
                let dir = self.config.resolved_download_dir();
                self.download_message(&last, MessageFormat::Txt, &dir)
                    .map(|_| ())
            }
            SlashCommand::Summary => self.send_message(SUMMARY_PROMPT, Vec::new()).await,
        }
    }

    // === Persistence ===

    /// Messages with every running reveal already complete.
    fn settled_messages(&self) -> Vec<Message> {
        let mut messages = self.conversation.messages().to_vec();
        for message in &mut messages {
            if let Some(pending) = self.revealing.get(&message.id) {
                message.content.clone_from(&pending.full);
            }
        }
        messages
    }

    fn persist(&self) {
        let state = MirrorState {
            sessions: self.directory.sessions().to_vec(),
            active_session_id: self.active_session_id.clone(),
            messages: self.settled_messages(),
            annotations: self.annotations.clone(),
        };
        if let Err(e) = self.mirror.save(&state) {
            warn!(path = %self.mirror.path().display(), error = %e, "could not save chat state");
        }
    }

    /// Record a failure for display and hand it back.
    fn fail(&mut self, context: &str, err: ChatError) -> ChatError {
        warn!(error = %err, "{context}");
        self.notices.error(format!("{context}: {err}"));
        err
    }
}

fn decode_response(response: ChatResponse) -> (ReplyPayload, Option<String>) {
    let raw = response
        .reply
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| NO_REPLY.to_string());
    (ReplyPayload::decode(&raw), response.download_url)
}

/// Local file name for an artifact link: its last path segment, decoded.
fn artifact_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |d| d.into_owned());
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        "download".to_string()
    } else {
        name.to_string()
    }
}
