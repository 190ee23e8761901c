//! Ordered message list of the active session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryStatus, Message, MessageId};

/// Messages of one calendar day, in conversation order.
#[derive(Debug, PartialEq, Eq)]
pub struct DateGroup<'a> {
    pub date_key: &'a str,
    /// `(index in the conversation, message)`
    pub entries: Vec<(usize, &'a Message)>,
}

/// The visible conversation.
///
/// Messages only ever join at the end; edits mutate in place and keep the id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub const fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    pub fn find(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Mutate the message with `id` in place. Returns `false` if absent.
    pub fn update<F>(&mut self, id: &MessageId, f: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                f(message);
                true
            }
            None => false,
        }
    }

    pub fn set_content(&mut self, id: &MessageId, content: &str) -> bool {
        self.update(id, |m| {
            m.content.clear();
            m.content.push_str(content);
        })
    }

    pub fn advance_status(&mut self, id: &MessageId, status: DeliveryStatus) -> bool {
        self.update(id, |m| m.advance_status(status))
    }

    /// Index of the first assistant message after `index`.
    pub fn paired_assistant(&self, index: usize) -> Option<usize> {
        self.messages
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, m)| m.is_assistant())
            .map(|(i, _)| i)
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.position(id)?;
        Some(self.messages.remove(index))
    }

    /// Swap in another session's messages.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Group consecutive messages that share a `date_key`.
    ///
    /// A key that reappears later starts a new group, so flattening the
    /// groups yields conversation order.
    pub fn grouped_by_date(&self) -> Vec<DateGroup<'_>> {
        let mut groups: Vec<DateGroup<'_>> = Vec::new();
        for (index, message) in self.messages.iter().enumerate() {
            match groups.last_mut() {
                Some(group) if group.date_key == message.date_key => {
                    group.entries.push((index, message));
                }
                _ => groups.push(DateGroup {
                    date_key: &message.date_key,
                    entries: vec![(index, message)],
                }),
            }
        }
        groups
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Client-local reactions and pins keyed by message id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub reactions: BTreeMap<MessageId, Vec<String>>,
    pub pinned: BTreeSet<MessageId>,
}

impl Annotations {
    pub fn react(&mut self, id: &MessageId, emoji: impl Into<String>) {
        self.reactions.entry(id.clone()).or_default().push(emoji.into());
    }

    pub fn reactions_for(&self, id: &MessageId) -> &[String] {
        self.reactions.get(id).map_or(&[], Vec::as_slice)
    }

    /// Flip the pin on a message; returns whether it is now pinned.
    pub fn toggle_pin(&mut self, id: &MessageId) -> bool {
        if self.pinned.remove(id) {
            false
        } else {
            self.pinned.insert(id.clone());
            true
        }
    }

    pub fn is_pinned(&self, id: &MessageId) -> bool {
        self.pinned.contains(id)
    }

    /// Drop everything recorded for a removed message.
    pub fn forget(&mut self, id: &MessageId) {
        self.reactions.remove(id);
        self.pinned.remove(id);
    }
}
