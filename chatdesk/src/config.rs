//! Client configuration.
//!
//! Layered: built-in defaults, then an optional JSON file, then
//! `CHATDESK_*` environment variables. CLI flags are applied last by the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default backend location.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// Directory name used under the platform config and data dirs.
const APP_DIR: &str = "chatdesk";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "chat_state.json";

pub const ENV_API_BASE: &str = "CHATDESK_API_BASE";
pub const ENV_STATE_PATH: &str = "CHATDESK_STATE_PATH";
pub const ENV_REVEAL_MS: &str = "CHATDESK_REVEAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat API, including the `/api` prefix.
    pub api_base: String,
    /// Delay between revealed characters.
    pub reveal_interval_ms: u64,
    /// How long a toast stays visible.
    pub toast_ttl_ms: u64,
    /// Location of the local state mirror.
    pub state_path: Option<PathBuf>,
    /// Per-request timeout. No timeout when unset.
    pub request_timeout_secs: Option<u64>,
    /// Name shown for the user in transcripts.
    pub user_name: Option<String>,
    /// Where downloads and exports land when no directory is given.
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            reveal_interval_ms: 5,
            toast_ttl_ms: 3000,
            state_path: None,
            request_timeout_secs: None,
            user_name: None,
            download_dir: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; otherwise the default config file is
    /// read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `<config_dir>/chatdesk/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Override fields from environment lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(ENV_API_BASE).filter(|v| !v.is_empty()) {
            self.api_base = base;
        }
        if let Some(path) = lookup(ENV_STATE_PATH).filter(|v| !v.is_empty()) {
            self.state_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = lookup(ENV_REVEAL_MS) {
            match ms.parse() {
                Ok(ms) => self.reveal_interval_ms = ms,
                Err(_) => tracing::warn!(value = %ms, "ignoring invalid {ENV_REVEAL_MS}"),
            }
        }
    }

    /// Where the local mirror lives.
    pub fn resolved_state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_DIR}")))
                .join(STATE_FILE)
        })
    }

    /// Where downloads go: the configured directory, else the platform
    /// download dir, else the working directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub const fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }

    pub const fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ttl_ms)
    }
}
