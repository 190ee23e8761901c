//! The list of sessions known to the client.
//!
//! Remote state (ids, titles, previews) is refreshed from the backend; the
//! favorite flag and tags only exist locally and survive refreshes.

use std::collections::HashMap;
use std::ops::Range;

use regex::RegexBuilder;
use tracing::{debug, info};

use crate::api::ChatApi;
use crate::error::{ChatError, Result};
use crate::models::SessionSummary;
use crate::render::escape_html;

/// First message posted when a session is created.
pub const NEW_CHAT_MESSAGE: &str = "New chat";

/// Reply stored alongside [`NEW_CHAT_MESSAGE`].
pub const NEW_CHAT_REPLY: &str = "Started a new chat";

/// A session whose title matched a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub session: &'a SessionSummary,
    /// Byte ranges of the matches within the title.
    pub spans: Vec<Range<usize>>,
}

impl SearchHit<'_> {
    /// Escaped title with every match wrapped in `<mark>`.
    pub fn to_markup(&self) -> String {
        let title = &self.session.title;
        let mut out = String::with_capacity(title.len() + self.spans.len() * 13);
        let mut last = 0;
        for span in &self.spans {
            out.push_str(&escape_html(&title[last..span.start]));
            out.push_str("<mark>");
            out.push_str(&escape_html(&title[span.clone()]));
            out.push_str("</mark>");
            last = span.end;
        }
        out.push_str(&escape_html(&title[last..]));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDirectory {
    sessions: Vec<SessionSummary>,
}

impl SessionDirectory {
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    /// Restore a directory saved in the local mirror.
    pub const fn from_sessions(sessions: Vec<SessionSummary>) -> Self {
        Self { sessions }
    }

    /// Sessions in refresh order, newest first.
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut SessionSummary> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ChatError::UnknownSession(id.to_string()))
    }

    /// Reload the list from the backend.
    ///
    /// The backend lists oldest first; the directory keeps newest first.
    /// Local flags are carried over by id.
    pub async fn refresh<A: ChatApi + ?Sized>(&mut self, api: &A) -> Result<()> {
        let remote = api.list_sessions().await?;
        let mut previous: HashMap<String, SessionSummary> = self
            .sessions
            .drain(..)
            .map(|s| (s.id.clone(), s))
            .collect();

        self.sessions = remote
            .into_iter()
            .rev()
            .map(|session| {
                let mut summary =
                    SessionSummary::new(session.id, session.title, &session.messages);
                if let Some(old) = previous.remove(&summary.id) {
                    summary.favorite = old.favorite;
                    summary.tags = old.tags;
                }
                summary
            })
            .collect();
        debug!(count = self.sessions.len(), "refreshed sessions");
        Ok(())
    }

    /// Create a session on the backend and reload the list.
    ///
    /// Returns the new session id.
    pub async fn create<A: ChatApi + ?Sized>(&mut self, api: &A, title: &str) -> Result<String> {
        let id = api.create_session(title, NEW_CHAT_REPLY).await?;
        info!(session = %id, "created session");
        self.refresh(api).await?;
        Ok(id)
    }

    pub async fn rename<A: ChatApi + ?Sized>(
        &mut self,
        api: &A,
        id: &str,
        title: &str,
    ) -> Result<()> {
        let title = title.trim();
        api.rename_session(id, title).await?;
        if let Ok(session) = self.get_mut(id) {
            session.title = if title.is_empty() {
                crate::models::UNTITLED.to_string()
            } else {
                title.to_string()
            };
        }
        Ok(())
    }

    pub async fn delete<A: ChatApi + ?Sized>(&mut self, api: &A, id: &str) -> Result<()> {
        api.delete_session(id).await?;
        self.sessions.retain(|s| s.id != id);
        info!(session = %id, "deleted session");
        Ok(())
    }

    pub async fn delete_all<A: ChatApi + ?Sized>(&mut self, api: &A) -> Result<()> {
        api.delete_all_sessions().await?;
        self.sessions.clear();
        info!("deleted all sessions");
        Ok(())
    }

    /// Update the preview of one session after local changes.
    pub fn set_preview(&mut self, id: &str, preview: String) {
        if let Ok(session) = self.get_mut(id) {
            session.preview = preview;
        }
    }

    /// Flip the favorite flag; returns the new value.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let session = self.get_mut(id)?;
        session.favorite = !session.favorite;
        Ok(session.favorite)
    }

    /// Add a tag. Returns whether it was new; blank tags are ignored.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let session = self.get_mut(id)?;
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(false);
        }
        Ok(session.tags.insert(tag.to_string()))
    }

    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let session = self.get_mut(id)?;
        Ok(session.tags.remove(tag.trim()))
    }

    /// Sessions whose title contains `query`, ignoring case.
    ///
    /// A blank query matches every session with no highlighted spans.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return self
                .display_order()
                .into_iter()
                .map(|session| SearchHit {
                    session,
                    spans: Vec::new(),
                })
                .collect();
        }

        let Ok(pattern) = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        else {
            return Vec::new();
        };

        self.display_order()
            .into_iter()
            .filter_map(|session| {
                let spans: Vec<_> = pattern.find_iter(&session.title).map(|m| m.range()).collect();
                (!spans.is_empty()).then_some(SearchHit { session, spans })
            })
            .collect()
    }

    /// Sessions as listed: non-favorites first, then favorites, each group in
    /// refresh order.
    pub fn display_order(&self) -> Vec<&SessionSummary> {
        let (favorites, others): (Vec<_>, Vec<_>) =
            self.sessions.iter().partition(|s| s.favorite);
        others.into_iter().chain(favorites).collect()
    }

    /// The session after (or before) `current` in display order.
    ///
    /// With no current session, stepping forward starts at the top and
    /// stepping back starts at the bottom. Stops at the ends.
    pub fn neighbor(&self, current: Option<&str>, forward: bool) -> Option<&SessionSummary> {
        let order = self.display_order();
        let position = current.and_then(|id| order.iter().position(|s| s.id == id));
        let target = match (position, forward) {
            (None, true) => 0,
            (None, false) => order.len().checked_sub(1)?,
            (Some(i), true) => i + 1,
            (Some(i), false) => i.checked_sub(1)?,
        };
        order.get(target).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    fn summary(id: &str, title: &str) -> SessionSummary {
        SessionSummary::new(id, Some(title.to_string()), &[Message::assistant("hello")])
    }

    fn directory(titles: &[(&str, &str)]) -> SessionDirectory {
        SessionDirectory::from_sessions(titles.iter().map(|(id, t)| summary(id, t)).collect())
    }

    #[test]
    fn display_order_puts_favorites_last() {
        let mut dir = directory(&[("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")]);
        dir.toggle_favorite("a").unwrap();
        dir.toggle_favorite("c").unwrap();
        let ids: Vec<_> = dir.display_order().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);
    }

    #[test]
    fn favorite_toggle_unknown_session() {
        let mut dir = directory(&[("a", "A")]);
        assert!(matches!(
            dir.toggle_favorite("zzz"),
            Err(ChatError::UnknownSession(id)) if id == "zzz"
        ));
    }

    #[test]
    fn search_is_case_insensitive_with_spans() {
        let dir = directory(&[("a", "Rust notes"), ("b", "Groceries"), ("c", "trust <fall>")]);
        let hits = dir.search("RUST");
        let ids: Vec<_> = hits.iter().map(|h| h.session.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(hits[0].spans, vec![0..4]);
        assert_eq!(hits[1].to_markup(), "t<mark>rust</mark> &lt;fall&gt;");
    }

    #[test]
    fn search_treats_query_literally() {
        let dir = directory(&[("a", "a.b"), ("b", "axb")]);
        let hits = dir.search("a.b");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session.id, "a");
    }

    #[test]
    fn blank_search_lists_everything() {
        let dir = directory(&[("a", "A"), ("b", "B")]);
        assert_eq!(dir.search("  ").len(), 2);
    }

    #[test]
    fn tags_ignore_blank_and_duplicates() {
        let mut dir = directory(&[("a", "A")]);
        assert!(dir.add_tag("a", " work ").unwrap());
        assert!(!dir.add_tag("a", "work").unwrap());
        assert!(!dir.add_tag("a", "   ").unwrap());
        assert!(dir.remove_tag("a", "work").unwrap());
        assert!(dir.get("a").unwrap().tags.is_empty());
    }

    #[test]
    fn neighbor_walks_display_order() {
        let mut dir = directory(&[("a", "A"), ("b", "B"), ("c", "C")]);
        dir.toggle_favorite("a").unwrap();
        assert_eq!(dir.neighbor(None, true).unwrap().id, "b");
        assert_eq!(dir.neighbor(None, false).unwrap().id, "a");
        assert_eq!(dir.neighbor(Some("c"), true).unwrap().id, "a");
        assert!(dir.neighbor(Some("a"), true).is_none());
        assert!(dir.neighbor(Some("b"), false).is_none());
    }
}
