//! Plain-text results view, grouped by file.

use std::fmt::Write as _;
use std::path::Path;

use crate::search::Match;

/// Render every match under a header, grouped by file in first-seen order.
///
/// ```text
/// Search results for "TODO" (3 lines in 2 files):
///
/// /proj/src/a.rs:
///   4:9: // TODO one
///   7:5: TODO two
///
/// /proj/src/b.rs:
///   1:1: TODO three
/// ```
#[must_use]
pub fn format_results_view(query: &str, matches: &[Match], working_dir: &Path) -> String {
    let mut groups: Vec<(&Path, Vec<&Match>)> = Vec::new();
    for m in matches {
        match groups.iter_mut().find(|(path, _)| *path == m.file_path.as_path()) {
            Some((_, entries)) => entries.push(m),
            None => groups.push((m.file_path.as_path(), vec![m])),
        }
    }

    let mut out = format!(
        "Search results for \"{query}\" ({} lines in {} files):\n",
        matches.len(),
        groups.len()
    );
    for (path, entries) in &groups {
        let _ = write!(out, "\n{}:\n", working_dir.join(path).display());
        for m in entries {
            let location = match m.column {
                Some(column) => format!("{}:{column}", m.line),
                None => m.line.to_string(),
            };
            let _ = writeln!(out, "  {location}: {}", m.line_text.trim());
        }
    }
    out
}
