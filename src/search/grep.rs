//! Recursive `grep`.

use super::grammar::{into_match, parse_without_column, root_args};
use super::{Capabilities, EngineAdapter, Match, SearchQuery};

/// Adapter for `grep -rnH --null`.
///
/// grep does not report columns; for literal queries the column and matched
/// text are recovered by locating the query in the line.
pub struct GrepAdapter;

impl EngineAdapter for GrepAdapter {
    fn executable_name(&self) -> &'static str {
        "grep"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["-r", "-n", "-H", "-I", "--null", "--color=never"]
            .into_iter()
            .map(String::from)
            .collect();

        if !query.case_sensitive {
            args.push("-i".to_string());
        }
        if query.whole_word {
            args.push("-w".to_string());
        }
        args.push(if query.regex { "-E" } else { "-F" }.to_string());
        for glob in &query.include_globs {
            args.push(format!("--include={glob}"));
        }
        for glob in &query.exclude_globs {
            args.push(format!("--exclude={glob}"));
            args.push(format!("--exclude-dir={glob}"));
        }
        args.extend(query.extra_args.iter().cloned());
        args.push("-e".to_string());
        args.push(query.text.clone());
        args.push("--".to_string());
        args.extend(root_args(query));
        args
    }

    fn parse_line(&self, line: &str, query: &SearchQuery) -> Option<Match> {
        into_match(parse_without_column(line)?, query)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            case_sensitivity: true,
            whole_word: true,
            literal: true,
            include_globs: true,
            exclude_globs: true,
            reports_column: false,
        }
    }
}
