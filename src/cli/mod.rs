//! CLI interface for projsearch.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::search::EngineId;

/// Command-line interface for projsearch.
#[derive(Parser)]
#[command(name = "projsearch")]
#[command(author, version, about = "Search a project with an external search tool", long_about = None)]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search the project and list the matches.
    Search(SearchArgs),

    /// Show every supported engine and whether its executable is found.
    Engines,
}

#[derive(Debug, Clone, Default, clap::Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct SearchArgs {
    /// Text to search for. Defaults to the previous query and engine.
    pub query: Option<String>,

    /// Search engine to run.
    #[arg(short, long)]
    pub engine: Option<EngineId>,

    /// Match case exactly (default is case-insensitive).
    #[arg(short = 's', long)]
    pub case_sensitive: bool,

    /// Only match whole words.
    #[arg(short, long)]
    pub whole_word: bool,

    /// Treat the query as a regular expression.
    #[arg(short = 'r', long, conflicts_with = "definition")]
    pub regex: bool,

    /// Find where the query symbol is defined instead of every use.
    #[arg(short, long)]
    pub definition: bool,

    /// Comma-separated globs of files to search.
    #[arg(short = 'I', long)]
    pub include: Option<String>,

    /// Comma-separated globs of files or directories to skip.
    #[arg(short = 'X', long)]
    pub exclude: Option<String>,

    /// Abort the search after this many seconds.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Directory to search (repeatable). Defaults to the current directory.
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,

    /// Print all results grouped by file.
    #[arg(short, long)]
    pub list: bool,

    /// Fuzzy filter applied to the result list.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Activate the N-th listed entry (1-based).
    #[arg(long, value_name = "N")]
    pub select: Option<usize>,

    /// Report only the first of consecutive matching lines in a file.
    #[arg(long)]
    pub collapse_adjacent: bool,
}
