//! HTTP client for the chat backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::wire::{
    ChatRequest, ChatResponse, CreatedSession, ErrorBody, RemoteSession, SessionDetail,
    SessionList,
};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::models::{Message, MessageId};

/// Operations the chat view needs from the backend.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /chats`, in backend order.
    async fn list_sessions(&self) -> Result<Vec<RemoteSession>>;

    /// `POST /chats`, returns the new session id.
    async fn create_session(&self, message: &str, reply: &str) -> Result<String>;

    /// `GET /chats/{id}`
    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// `PATCH /chats/{id}`
    async fn rename_session(&self, session_id: &str, title: &str) -> Result<()>;

    /// `DELETE /chats/{id}`
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// `DELETE /chats`
    async fn delete_all_sessions(&self) -> Result<()>;

    /// `DELETE /chats/{id}/message/{msg_id}`
    async fn delete_message(&self, session_id: &str, message_id: &MessageId) -> Result<()>;

    /// `POST /chat`
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Fetch a generated artifact.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`ChatApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base: String,
}

impl HttpChatApi {
    /// Build a client for `config.api_base`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn session_url(&self, session_id: &str) -> String {
        self.url(&format!("/chats/{}", urlencoding::encode(session_id)))
    }

    /// Resolve a possibly relative artifact link against the API host.
    fn resolve(&self, link: &str) -> Result<Url> {
        let base = Url::parse(&self.base).map_err(|source| ChatError::InvalidUrl {
            url: self.base.clone(),
            source,
        })?;
        base.join(link).map_err(|source| ChatError::InvalidUrl {
            url: link.to_string(),
            source,
        })
    }
}

/// Turn a non-success response into [`ChatError::Status`].
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(ChatError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Read a JSON body, keeping parse failures distinct from transport ones.
async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_sessions(&self) -> Result<Vec<RemoteSession>> {
        let url = self.url("/chats");
        debug!(%url, "listing sessions");
        let resp = check(self.client.get(&url).send().await?).await?;
        let list: SessionList = json(resp).await?;
        Ok(list.sessions.into_iter().map(RemoteSession::from).collect())
    }

    async fn create_session(&self, message: &str, reply: &str) -> Result<String> {
        let url = self.url("/chats");
        debug!(%url, "creating session");
        let body = serde_json::json!({ "message": message, "reply": reply });
        let resp = check(self.client.post(&url).json(&body).send().await?).await?;
        let created: CreatedSession = json(resp).await?;
        Ok(created.chat_id)
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let url = self.session_url(session_id);
        debug!(%url, "fetching session");
        let resp = check(self.client.get(&url).send().await?).await?;
        let detail: SessionDetail = json(resp).await?;
        Ok(super::wire::convert_messages(detail.messages))
    }

    async fn rename_session(&self, session_id: &str, title: &str) -> Result<()> {
        let url = self.session_url(session_id);
        let body = serde_json::json!({ "title": title });
        check(self.client.patch(&url).json(&body).send().await?).await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.session_url(session_id);
        check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn delete_all_sessions(&self) -> Result<()> {
        let url = self.url("/chats");
        check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn delete_message(&self, session_id: &str, message_id: &MessageId) -> Result<()> {
        let url = format!(
            "{}/message/{}",
            self.session_url(session_id),
            urlencoding::encode(message_id.as_str())
        );
        check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.url("/chat");
        let builder = if request.files.is_empty() {
            debug!(%url, chat_id = ?request.chat_id, "sending message");
            self.client.post(&url).json(&request.json_body())
        } else {
            debug!(%url, files = request.files.len(), "sending message with uploads");
            let mut form = Form::new().text("message", request.message.clone());
            if let Some(chat_id) = &request.chat_id {
                form = form.text("chat_id", chat_id.clone());
            }
            for file in &request.files {
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.attachment.name.clone())
                    .mime_str(&file.attachment.media_type)?;
                form = form.part("files", part);
            }
            self.client.post(&url).multipart(form)
        };

        let resp = check(builder.send().await?).await?;
        json(resp).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve(url)?;
        debug!(%url, "downloading artifact");
        let resp = check(self.client.get(url).send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}
