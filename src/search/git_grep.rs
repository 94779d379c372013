//! `git grep`.

use super::grammar::{into_match, parse_with_column};
use super::{Capabilities, EngineAdapter, Match, SearchQuery};

/// Adapter for `git grep -n --column -z`.
///
/// git grep searches the repository containing the working directory, so only
/// the first root is used. Globs become pathspecs.
pub struct GitGrepAdapter;

impl EngineAdapter for GitGrepAdapter {
    fn executable_name(&self) -> &'static str {
        "git"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["grep", "--no-color", "-n", "--column", "-z", "-I"]
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
        args.extend(query.extra_args.iter().cloned());
        args.push("-e".to_string());
        args.push(query.text.clone());

        if !query.include_globs.is_empty() || !query.exclude_globs.is_empty() {
            args.push("--".to_string());
            for glob in &query.include_globs {
                args.push(format!(":(glob){glob}"));
            }
            for glob in &query.exclude_globs {
                args.push(format!(":(exclude,glob){glob}"));
            }
        }
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
