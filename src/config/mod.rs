//! Configuration loading for projsearch.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::runner::RunOptions;
use crate::search::registry::EngineRegistry;
use crate::search::{EngineId, SearchQuery};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "PROJSEARCH_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown engine in config: {0}")]
    UnknownEngine(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration loaded from config.toml.
///
/// Per-engine tables are keyed by engine name:
///
/// ```toml
/// engine = "silver_searcher"
/// exclude_globs = ["target", "*.min.js"]
///
/// [engine_path_overrides]
/// silver_searcher = "~/bin/ag"
///
/// [engine_extra_args]
/// grep = ["--binary-files=without-match"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    pub engine: EngineId,
    pub engine_path_overrides: HashMap<String, String>,
    pub engine_search_paths: HashMap<String, Vec<String>>,
    pub engine_extra_args: HashMap<String, Vec<String>>,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub regex: bool,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub timeout_seconds: u64,
    pub grace_period_ms: u64,
    /// Print the grouped results view instead of the list.
    pub show_list_by_default: bool,
    pub collapse_adjacent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineId::default(),
            engine_path_overrides: HashMap::new(),
            engine_search_paths: HashMap::new(),
            engine_extra_args: HashMap::new(),
            case_sensitive: false,
            whole_word: false,
            regex: false,
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            timeout_seconds: 30,
            grace_period_ms: 500,
            show_list_by_default: false,
            collapse_adjacent: false,
        }
    }
}

impl Config {
    /// Load config from `$PROJSEARCH_CONFIG` or the platform config
    /// directory, or return defaults when there is no file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "projsearch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check values serde cannot: engine-keyed tables and positive timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownEngine` for a key that names no engine and
    /// `ConfigError::Invalid` for a zero timeout or an engine named twice in
    /// one table (`ag` and `silver_searcher`, say).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeout_seconds must be positive".to_string()));
        }
        check_table("engine_path_overrides", self.engine_path_overrides.keys())?;
        check_table("engine_search_paths", self.engine_search_paths.keys())?;
        check_table("engine_extra_args", self.engine_extra_args.keys())?;
        Ok(())
    }

    /// Engine registry with the configured executable paths.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownEngine` for a table key that names no engine.
    pub fn registry(&self) -> Result<EngineRegistry, ConfigError> {
        let mut registry = EngineRegistry::new();
        for (name, path) in &self.engine_path_overrides {
            registry = registry.with_override(parse_engine(name)?, expand_tilde(path));
        }
        for (name, dirs) in &self.engine_search_paths {
            let dirs = dirs.iter().map(|d| expand_tilde(d)).collect();
            registry = registry.with_search_paths(parse_engine(name)?, dirs);
        }
        Ok(registry)
    }

    /// Extra arguments configured for `engine`.
    #[must_use]
    pub fn extra_args(&self, engine: EngineId) -> Vec<String> {
        self.engine_extra_args
            .iter()
            .find(|(name, _)| name.parse::<EngineId>().is_ok_and(|id| id == engine))
            .map(|(_, args)| args.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: Duration::from_secs(self.timeout_seconds),
            grace_period: Duration::from_millis(self.grace_period_ms),
            collapse_adjacent: self.collapse_adjacent,
        }
    }

    /// A query carrying the configured defaults for `engine`.
    #[must_use]
    pub fn query(&self, text: &str, engine: EngineId, roots: Vec<PathBuf>) -> SearchQuery {
        SearchQuery {
            case_sensitive: self.case_sensitive,
            whole_word: self.whole_word,
            regex: self.regex,
            include_globs: self.include_globs.clone(),
            exclude_globs: self.exclude_globs.clone(),
            extra_args: self.extra_args(engine),
            ..SearchQuery::new(text, engine, roots)
        }
    }
}

fn check_table<'a>(table: &str, keys: impl Iterator<Item = &'a String>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in keys {
        let engine = parse_engine(name)?;
        if !seen.insert(engine) {
            return Err(ConfigError::Invalid(format!(
                "engine {engine} is configured more than once in [{table}]"
            )));
        }
    }
    Ok(())
}

fn parse_engine(name: &str) -> Result<EngineId, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::UnknownEngine(name.to_string()))
}

/// Expand ~ to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}
