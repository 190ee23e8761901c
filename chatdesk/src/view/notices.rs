//! Toasts and the error banner.
//!
//! Toasts expire after a fixed time to live. The banner holds the latest
//! error until it is dismissed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: NoticeLevel,
    pub text: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Notices {
    ttl: Duration,
    toasts: Vec<Toast>,
    banner: Option<String>,
}

impl Notices {
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            toasts: Vec::new(),
            banner: None,
        }
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push_at(NoticeLevel::Success, text.into(), Instant::now());
    }

    /// Record a failure as a toast and in the banner.
    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.banner = Some(text.clone());
        self.push_at(NoticeLevel::Error, text, Instant::now());
    }

    fn push_at(&mut self, level: NoticeLevel, text: String, shown_at: Instant) {
        self.toasts.push(Toast {
            level,
            text,
            shown_at,
        });
    }

    /// Drop toasts that have expired by `now`.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < ttl);
    }

    /// Toasts still visible, oldest first.
    pub fn toasts(&mut self) -> &[Toast] {
        self.prune(Instant::now());
        &self.toasts
    }

    /// Remove and return every pending toast.
    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        self.prune(Instant::now());
        std::mem::take(&mut self.toasts)
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }
}
