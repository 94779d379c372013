//! The Platinum Searcher (`pt`).

use super::grammar::{glob_to_regex, into_match, parse_with_column, root_args};
use super::{Capabilities, EngineAdapter, Match, SearchQuery};

/// Adapter for `pt --nogroup --column`. pt searches literally and
/// case-sensitively unless told otherwise.
pub struct PlatinumSearcherAdapter;

impl EngineAdapter for PlatinumSearcherAdapter {
    fn executable_name(&self) -> &'static str {
        "pt"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["--nocolor", "--nogroup", "--column"]
            .into_iter()
            .map(String::from)
            .collect();

        if !query.case_sensitive {
            args.push("-i".to_string());
        }
        if query.whole_word {
            args.push("-w".to_string());
        }
        if query.regex {
            args.push("-e".to_string());
        }
        for glob in &query.exclude_globs {
            args.push(format!("--ignore={glob}"));
        }
        if !query.include_globs.is_empty() {
            let alternatives: Vec<String> =
                query.include_globs.iter().map(|g| glob_to_regex(g)).collect();
            args.push(format!("--file-search-regexp=(?:{})", alternatives.join("|")));
        }
        args.extend(query.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(query.text.clone());
        args.extend(root_args(query));
        args
    }

    fn parse_line(&self, line: &str, query: &SearchQuery) -> Option<Match> {
        into_match(parse_with_column(line)?, query)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            case_sensitivity: true,
            whole_word: true,
            literal: true,
            include_globs: true,
            exclude_globs: true,
            reports_column: true,
        }
    }
}
