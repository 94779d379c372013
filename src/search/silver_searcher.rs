//! The Silver Searcher (`ag`).

use super::grammar::{glob_to_regex, into_match, parse_with_column, root_args};
use super::{Capabilities, EngineAdapter, Match, SearchQuery};

/// Adapter for `ag --nogroup --column`, which prints `path:line:col:text`.
pub struct SilverSearcherAdapter;

impl EngineAdapter for SilverSearcherAdapter {
    fn executable_name(&self) -> &'static str {
        "ag"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["--nocolor", "--nogroup", "--column", "--filename"]
            .into_iter()
            .map(String::from)
            .collect();

        // ag defaults to smart case, so always state the mode explicitly.
        args.push(if query.case_sensitive { "-s" } else { "-i" }.to_string());
        if query.whole_word {
            args.push("-w".to_string());
        }
        if !query.regex {
            args.push("-Q".to_string());
        }
        for glob in &query.exclude_globs {
            args.push("--ignore".to_string());
            args.push(glob.clone());
        }
        if !query.include_globs.is_empty() {
            let alternatives: Vec<String> =
                query.include_globs.iter().map(|g| glob_to_regex(g)).collect();
            args.push("-G".to_string());
            args.push(format!("(?:{})", alternatives.join("|")));
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

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::search::EngineId;

    fn query(text: &str) -> SearchQuery {
        SearchQuery::new(
            text,
            EngineId::SilverSearcher,
            vec![PathBuf::from("/work/project")],
        )
    }

    #[test]
    fn default_args() {
        let args = SilverSearcherAdapter.build_args(&query("TODO"));
        assert_eq!(
            args,
            [
                "--nocolor",
                "--nogroup",
                "--column",
                "--filename",
                "-i",
                "-Q",
                "--",
                "TODO",
                "/work/project"
            ]
        );
    }

    #[test]
    fn flags_and_globs() {
        let mut q = query("fn main");
        q.case_sensitive = true;
        q.whole_word = true;
        q.regex = true;
        q.exclude_globs = vec!["target".to_string()];
        q.include_globs = vec!["*.rs".to_string()];
        let args = SilverSearcherAdapter.build_args(&q);
        assert!(args.contains(&"-s".to_string()));
        assert!(args.contains(&"-w".to_string()));
        assert!(!args.contains(&"-Q".to_string()));
        let ignore = args.iter().position(|a| a == "--ignore").unwrap();
        assert_eq!(args[ignore + 1], "target");
        let include = args.iter().position(|a| a == "-G").unwrap();
        assert_eq!(args[include + 1], "(?:[^/]*\\.rs$)");
    }

    #[test]
    fn parses_fixture_line() {
        let m = SilverSearcherAdapter
            .parse_line("/work/project/src/lib.rs:42:8:    // TODO: tidy", &query("todo"))
            .unwrap();
        assert_eq!(m.file_path, PathBuf::from("/work/project/src/lib.rs"));
        assert_eq!(m.line, 42);
        assert_eq!(m.column, Some(8));
        assert_eq!(m.match_text, "TODO");
        assert_eq!(m.line_text, "    // TODO: tidy");
    }

    #[test]
    fn ignores_noise() {
        assert!(
            SilverSearcherAdapter
                .parse_line("ERR: Skipping foo: Permission denied", &query("x"))
                .is_none()
        );
    }
}
