//! Character-by-character reveal of replies that already arrived.
//!
//! Each reveal is a tokio task keyed by message id that emits one frame per
//! character at a fixed interval. Restarting or cancelling a reveal aborts
//! its task; frames it already queued carry a stale generation and are
//! dropped by [`Presenter::next_frame`].

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::models::MessageId;

/// One step of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    pub message_id: MessageId,
    /// Text to append to the message. Empty on the final frame.
    pub delta: String,
    /// Set on the last frame of a reveal.
    pub done: bool,
    generation: u64,
}

#[derive(Debug)]
struct ActiveReveal {
    generation: u64,
    abort: AbortHandle,
}

/// Drives reveals for the messages of one view.
#[derive(Debug)]
pub struct Presenter {
    interval: Duration,
    tx: mpsc::UnboundedSender<RevealFrame>,
    rx: mpsc::UnboundedReceiver<RevealFrame>,
    active: HashMap<MessageId, ActiveReveal>,
    next_generation: u64,
}

impl Presenter {
    pub fn new(interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            interval,
            tx,
            rx,
            active: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Start revealing `text` into `message_id` from empty.
    ///
    /// Any reveal already running for the same message is cancelled. The
    /// caller clears the displayed text before applying frames.
    pub fn start(&mut self, message_id: MessageId, text: String) {
        self.cancel(&message_id);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.tx.clone();
        let interval = self.interval;
        let id = message_id.clone();
        let handle = tokio::spawn(async move {
            for ch in text.chars() {
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(interval).await;
                }
                let frame = RevealFrame {
                    message_id: id.clone(),
                    delta: ch.to_string(),
                    done: false,
                    generation,
                };
                if tx.send(frame).is_err() {
                    return;
                }
            }
            let _ = tx.send(RevealFrame {
                message_id: id,
                delta: String::new(),
                done: true,
                generation,
            });
        });

        trace!(%message_id, generation, "reveal started");
        self.active.insert(
            message_id,
            ActiveReveal {
                generation,
                abort: handle.abort_handle(),
            },
        );
    }

    /// Cancel the reveal of one message. Returns whether one was running.
    pub fn cancel(&mut self, message_id: &MessageId) -> bool {
        match self.active.remove(message_id) {
            Some(reveal) => {
                reveal.abort.abort();
                trace!(%message_id, "reveal cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, reveal) in self.active.drain() {
            reveal.abort.abort();
        }
    }

    pub fn is_active(&self, message_id: &MessageId) -> bool {
        self.active.contains_key(message_id)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Wait for the next frame of a live reveal.
    ///
    /// Returns `None` once no reveal is running.
    pub async fn next_frame(&mut self) -> Option<RevealFrame> {
        while !self.active.is_empty() {
            let frame = self.rx.recv().await?;
            let current = self.active.get(&frame.message_id).map(|r| r.generation);
            if current != Some(frame.generation) {
                continue;
            }
            if frame.done {
                self.active.remove(&frame.message_id);
            }
            return Some(frame);
        }
        None
    }
}

impl Drop for Presenter {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(presenter: &mut Presenter) -> Vec<RevealFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = presenter.next_frame().await {
            frames.push(frame);
        }
        frames
    }

    fn text_of(frames: &[RevealFrame], id: &MessageId) -> String {
        frames
            .iter()
            .filter(|f| &f.message_id == id)
            .map(|f| f.delta.as_str())
            .collect()
    }

    #[tokio::test]
    async fn reveals_one_character_per_frame() {
        let mut presenter = Presenter::new(Duration::ZERO);
        let id = MessageId::from("m1");
        presenter.start(id.clone(), "héllo".into());
        let frames = collect(&mut presenter).await;
        assert_eq!(frames.len(), 6);
        assert!(frames[..5].iter().all(|f| f.delta.chars().count() == 1));
        assert!(frames[5].done);
        assert_eq!(text_of(&frames, &id), "héllo");
        assert!(!presenter.is_active(&id));
    }

    #[tokio::test]
    async fn restart_discards_previous_frames() {
        let mut presenter = Presenter::new(Duration::ZERO);
        let id = MessageId::from("m1");
        presenter.start(id.clone(), "first reply".into());
        let first = presenter.next_frame().await.unwrap();
        assert_eq!(first.delta, "f");

        presenter.start(id.clone(), "second".into());
        let frames = collect(&mut presenter).await;
        assert_eq!(text_of(&frames, &id), "second");
        assert!(frames.last().unwrap().done);
    }

    #[tokio::test]
    async fn cancelled_reveal_yields_nothing() {
        let mut presenter = Presenter::new(Duration::from_millis(1));
        let id = MessageId::from("m1");
        presenter.start(id.clone(), "never shown".into());
        assert!(presenter.cancel(&id));
        assert!(!presenter.cancel(&id));
        assert_eq!(presenter.next_frame().await, None);
    }

    #[tokio::test]
    async fn independent_messages_reveal_together() {
        let mut presenter = Presenter::new(Duration::ZERO);
        let a = MessageId::from("a");
        let b = MessageId::from("b");
        presenter.start(a.clone(), "abc".into());
        presenter.start(b.clone(), "xyz".into());
        let frames = collect(&mut presenter).await;
        assert_eq!(text_of(&frames, &a), "abc");
        assert_eq!(text_of(&frames, &b), "xyz");
        assert_eq!(frames.iter().filter(|f| f.done).count(), 2);
    }

    #[tokio::test]
    async fn empty_text_finishes_immediately() {
        let mut presenter = Presenter::new(Duration::ZERO);
        let id = MessageId::from("m");
        presenter.start(id.clone(), String::new());
        let frames = collect(&mut presenter).await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].done);
    }
}
