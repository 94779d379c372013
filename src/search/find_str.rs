//! Windows `findstr`.

use super::grammar::{into_match, parse_without_column};
use super::{Capabilities, EngineAdapter, LineMode, Match, SearchQuery};

/// Adapter for `findstr /S /N /P`.
///
/// findstr has no whole-word or exclude option. It selects files by pattern,
/// so each root is combined with every include glob (`*` when there are none).
/// Its output goes through the console code page and is parsed once the
/// process has exited.
pub struct FindStrAdapter;

impl EngineAdapter for FindStrAdapter {
    fn executable_name(&self) -> &'static str {
        "findstr"
    }

    fn build_args(&self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = ["/S", "/N", "/P"]
            .into_iter()
            .map(String::from)
            .collect();

        if !query.case_sensitive {
            args.push("/I".to_string());
        }
        args.push(if query.regex { "/R" } else { "/L" }.to_string());
        args.extend(query.extra_args.iter().cloned());
        // /C: keeps spaces inside the search string instead of OR-ing words.
        args.push(format!("/C:{}", query.text));

        let patterns: Vec<&str> = if query.include_globs.is_empty() {
            vec!["*"]
        } else {
            query.include_globs.iter().map(String::as_str).collect()
        };
        for root in &query.roots {
            for pattern in &patterns {
                args.push(root.join(pattern).to_string_lossy().into_owned());
            }
        }
        args
    }

    fn parse_line(&self, line: &str, query: &SearchQuery) -> Option<Match> {
        into_match(parse_without_column(line)?, query)
    }

    fn line_mode(&self) -> LineMode {
        LineMode::Buffered
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            case_sensitivity: true,
            whole_word: false,
            literal: true,
            include_globs: true,
            exclude_globs: false,
            reports_column: false,
        }
    }
}
