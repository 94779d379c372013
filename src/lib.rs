//! projsearch - Project search through external search tools.
//!
//! This library runs one of several command-line search tools (`ag`, `pt`,
//! `ack`, `git grep`, `grep`, `findstr`) over a project, normalizes their
//! output into [`search::Match`] values and serves them to a fuzzy-filterable
//! selector.
//!
//! # Modules
//!
//! - [`search`] - Match model, engine adapters and engine resolution
//! - [`store`] - Ordered, de-duplicated results of a session
//! - [`runner`] - Search sessions: process spawn, streaming, cancellation
//! - [`definition`] - Find-definition searches over labelled patterns
//! - [`selector`] - Fuzzy filtering and navigation over results
//! - [`session`] - Last query and engine, for quick re-runs
//! - [`commands`] - High-level operations behind the CLI
//! - [`config`] - Configuration loading
//! - [`cli`] - Command-line interface definitions

pub mod cli;
pub mod commands;
pub mod config;
pub mod definition;
pub mod runner;
pub mod search;
pub mod selector;
pub mod session;
pub mod store;
