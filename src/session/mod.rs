//! Quick re-run state: the last query and engine.
//!
//! The state is a plain value owned by the caller and handed to
//! [`SearchRunner::start`](crate::runner::SearchRunner::start), which records
//! every search that gets past `Starting`. Persisting it between runs is up to
//! the caller; the CLI keeps it as JSON in the platform data directory.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::search::{EngineId, SearchQuery};

/// Environment variable overriding the state file location.
pub const STATE_ENV: &str = "PROJSEARCH_STATE";

/// Errors that can occur when persisting session state.
#[derive(Debug, thiserror::Error)]
pub enum SessionStateError {
    #[error("Failed to write session state: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize session state: {0}")]
    SerializeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub last_query: String,
    #[serde(default)]
    pub last_engine: Option<EngineId>,
}

impl SessionState {
    /// Remember a search that has started.
    pub fn record(&mut self, query: &SearchQuery) {
        self.last_query.clone_from(&query.text);
        self.last_engine = Some(query.engine);
    }

    /// Default value for the search prompt: a single-line selection if there
    /// is one, otherwise the last query.
    #[must_use]
    pub fn prompt_default<'a>(&'a self, selection: Option<&'a str>) -> &'a str {
        match selection {
            Some(text) if !text.is_empty() && !text.contains('\n') => text,
            _ => &self.last_query,
        }
    }

    /// Load state from `path`. A missing or unreadable file yields the empty state.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring corrupt session state: {e}");
            Self::default()
        })
    }

    /// Write state to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SessionStateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `$PROJSEARCH_STATE`, or `state.json` in the platform data directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(STATE_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "projsearch").map(|dirs| dirs.data_dir().join("state.json"))
    }
}
