//! Search model, engine adapters and error taxonomy.
//!
//! Every supported external tool is described by an [`EngineAdapter`]. The
//! adapters are stateless: they turn a [`SearchQuery`] into an argument list
//! for their tool and turn the tool's output lines back into [`Match`] values.

pub mod ack;
pub mod engine;
pub mod find_str;
pub mod git_grep;
pub mod grammar;
pub mod grep;
pub mod platinum_searcher;
pub mod registry;
pub mod silver_searcher;

use std::path::PathBuf;
use std::time::Duration;

pub use engine::EngineId;

/// A single located occurrence of the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match {
    /// Path as reported by the engine (absolute or relative to the first root).
    pub file_path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column of the match start, when the engine reports or implies it.
    pub column: Option<usize>,
    /// The matched substring. Empty when only the line is known.
    pub match_text: String,
    /// Full text of the containing line.
    pub line_text: String,
}

/// Identity of a match within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: Option<usize>,
    pub match_text: String,
}

impl Match {
    #[must_use]
    pub fn key(&self) -> MatchKey {
        MatchKey {
            file_path: self.file_path.clone(),
            line: self.line,
            column: self.column,
            match_text: self.match_text.clone(),
        }
    }
}

/// An immutable description of one search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub engine: EngineId,
    /// Directories to search. The first one is the working directory.
    pub roots: Vec<PathBuf>,
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Treat `text` as a regular expression in the engine's own dialect.
    pub regex: bool,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    /// User options passed through to the engine before the query.
    pub extra_args: Vec<String>,
}

impl SearchQuery {
    /// Create a literal, case-insensitive query over `roots`.
    #[must_use]
    pub fn new(text: impl Into<String>, engine: EngineId, roots: Vec<PathBuf>) -> Self {
        Self {
            text: text.into(),
            engine,
            roots,
            case_sensitive: false,
            whole_word: false,
            regex: false,
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    /// The directory the engine process runs in.
    #[must_use]
    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.roots.first()
    }
}

/// How the runner should feed output to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    /// Parse and publish each line as soon as it arrives.
    PerLine,
    /// Collect the whole output and parse it once the process exits.
    Buffered,
}

/// Which [`SearchQuery`] options an engine can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub case_sensitivity: bool,
    pub whole_word: bool,
    pub literal: bool,
    pub include_globs: bool,
    pub exclude_globs: bool,
    /// The engine reports match columns itself.
    pub reports_column: bool,
}

/// Outcome class of an engine's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    Success,
    Failure,
}

/// Trait implemented once per supported search tool.
pub trait EngineAdapter: Send + Sync {
    /// Program name looked up on PATH when no override is configured.
    fn executable_name(&self) -> &'static str;

    /// Arguments following the executable, in order.
    ///
    /// The query is always a single element so no shell tokenization can
    /// split it. Options the engine cannot express are left out.
    fn build_args(&self, query: &SearchQuery) -> Vec<String>;

    /// Parse one output line. Returns `None` for lines outside the grammar.
    fn parse_line(&self, line: &str, query: &SearchQuery) -> Option<Match>;

    fn line_mode(&self) -> LineMode {
        LineMode::PerLine
    }

    fn capabilities(&self) -> Capabilities;

    /// Exit code 0 (matches) and 1 (no matches) both complete normally.
    fn exit_disposition(&self, code: i32) -> ExitDisposition {
        match code {
            0 | 1 => ExitDisposition::Success,
            _ => ExitDisposition::Failure,
        }
    }
}

/// Errors surfaced by the search core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("Unknown search engine: {0}")]
    EngineNotFound(String),

    #[error("Executable for {engine} not found: {attempted}")]
    ExecutableNotFound { engine: EngineId, attempted: String },

    #[error("{engine} failed (exit code {}): {stderr}", display_code(.code))]
    EngineExecutionFailed {
        engine: EngineId,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Search timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Failed to start {engine}: {message}")]
    Spawn { engine: EngineId, message: String },

    #[error("{engine} output could not be read: {message}")]
    Io { engine: EngineId, message: String },

    #[error("Invalid search: {0}")]
    InvalidQuery(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl SearchError {
    /// Process exit code for the CLI surface.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Timeout { .. } => 2,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}
