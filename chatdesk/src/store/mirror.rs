//! Durable local mirror of the chat view state.
//!
//! A best-effort cache: one JSON file, rewritten after every change and read
//! once at startup. The backend stays authoritative.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Annotations;
use crate::error::Result;
use crate::models::{Message, SessionSummary};

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorState {
    pub sessions: Vec<SessionSummary>,
    pub active_session_id: Option<String>,
    pub messages: Vec<Message>,
    pub annotations: Annotations,
}

/// File-backed mirror.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    path: PathBuf,
}

impl LocalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state.
    ///
    /// A missing file is `None`. So is a corrupt one, which is logged and
    /// left for the next save to overwrite.
    pub fn load(&self) -> Result<Option<MirrorState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable chat state");
                Ok(None)
            }
        }
    }

    /// Replace the saved state. Last write wins.
    pub fn save(&self, state: &MirrorState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), messages = state.messages.len(), "saved chat state");
        Ok(())
    }
}
