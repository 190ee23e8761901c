//! In-memory backend used by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use chatdesk::api::{ChatApi, ChatRequest, ChatResponse, RemoteSession};
use chatdesk::config::Config;
use chatdesk::error::{ChatError, Result};
use chatdesk::models::{Message, MessageId};
use chatdesk::view::ChatView;

/// What the next `POST /chat` answers.
pub enum Reply {
    Text(String),
    WithDownload(String, String),
    Fail(u16),
}

/// A recorded `POST /chat`.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub message: String,
    pub chat_id: Option<String>,
    pub reply_to: Option<String>,
    pub files: usize,
}

#[derive(Default)]
struct State {
    sessions: Vec<RemoteSession>,
    replies: VecDeque<Reply>,
    sent: Vec<SentRequest>,
    deleted_messages: Vec<(String, String)>,
    downloads: Vec<String>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn add_session(&self, title: &str, messages: Vec<Message>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("chat-{}", state.next_id);
        state.sessions.push(RemoteSession {
            id: id.clone(),
            title: Some(title.to_string()),
            messages,
        });
        id
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.sessions.iter().map(|s| s.id.clone()).collect()
    }

    pub fn deleted_messages(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted_messages.clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }
}

fn not_found(id: &str) -> ChatError {
    ChatError::Status {
        status: 404,
        message: format!("no chat {id}"),
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn list_sessions(&self) -> Result<Vec<RemoteSession>> {
        Ok(self.state.lock().unwrap().sessions.clone())
    }

    async fn create_session(&self, message: &str, _reply: &str) -> Result<String> {
        Ok(self.add_session(message, Vec::new()))
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| not_found(session_id))
    }

    async fn rename_session(&self, session_id: &str, title: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| not_found(session_id))?;
        session.title = Some(title.to_string());
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .retain(|s| s.id != session_id);
        Ok(())
    }

    async fn delete_all_sessions(&self) -> Result<()> {
        self.state.lock().unwrap().sessions.clear();
        Ok(())
    }

    async fn delete_message(&self, session_id: &str, message_id: &MessageId) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .deleted_messages
            .push((session_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.sent.push(SentRequest {
                message: request.message.clone(),
                chat_id: request.chat_id.clone(),
                reply_to: request.reply_to.as_ref().map(ToString::to_string),
                files: request.files.len(),
            });
            state.replies.pop_front()
        };

        let (text, download_url) = match reply {
            Some(Reply::Fail(status)) => {
                return Err(ChatError::Status {
                    status,
                    message: "backend exploded".into(),
                })
            }
            Some(Reply::Text(text)) => (text, None),
            Some(Reply::WithDownload(text, url)) => (text, Some(url)),
            None => (format!("echo: {}", request.message), None),
        };

        let chat_id = match &request.chat_id {
            Some(id) => id.clone(),
            None => self.add_session(&request.message, Vec::new()),
        };
        Ok(ChatResponse {
            reply: Some(text),
            chat_id: Some(chat_id),
            download_url,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.state.lock().unwrap().downloads.push(url.to_string());
        Ok(b"artifact bytes".to_vec())
    }
}

/// Config for a view whose mirror lives in `dir` and reveals instantly.
pub fn test_config(dir: &Path) -> Config {
    Config {
        state_path: Some(dir.join("chat_state.json")),
        download_dir: Some(dir.join("downloads")),
        reveal_interval_ms: 0,
        ..Config::default()
    }
}

pub fn view_in(dir: &Path) -> ChatView<FakeApi> {
    ChatView::new(FakeApi::new(), test_config(dir))
}
