//! `ack`.

use super::grammar::{glob_to_regex, into_match, parse_with_column, root_args};
use super::{Capabilities, EngineAdapter, Match, SearchQuery};

/// Adapter for `ack --nogroup --column -H`. ack has no include-by-glob
/// option, so include globs are dropped.
pub struct AckAdapter;

impl EngineAdapter for AckAdapter {
    fn executable_name(&self) -> &'static str {
        "ack"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["--nocolor", "--nogroup", "--column", "-H"]
            .into_iter()
            .map(String::from)
            .collect();

        if !query.case_sensitive {
            args.push("-i".to_string());
        }
        if query.whole_word {
            args.push("-w".to_string());
        }
        if !query.regex {
            args.push("-Q".to_string());
        }
        for glob in &query.exclude_globs {
            args.push(format!("--ignore-file=match:{}", glob_to_regex(glob)));
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
            include_globs: false,
            exclude_globs: true,
            reports_column: true,
        }
    }
}
