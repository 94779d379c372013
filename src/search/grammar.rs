//! Output grammars shared by the engine adapters.
//!
//! All supported tools print some variant of `path:line[:column]:text`. The
//! path may itself contain colons (Windows drive letters, odd directory
//! names), so the separator after the path is the leftmost `:` that is
//! followed by a line number and another `:`. Tools that can emit a NUL after
//! the path (`grep -Z`, `git grep -z`) are parsed on the NUL instead.
//!
//! Columns are 1-based byte offsets into the line, which is what the column
//! reporting engines emit.

use std::path::PathBuf;

use super::{Match, SearchError, SearchQuery};

/// Fields recovered from one output line before match text is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHit<'a> {
    pub path: &'a str,
    pub line: usize,
    pub column: Option<usize>,
    pub text: &'a str,
}

/// Parse `path:line:column:text`, falling back to `path:line:text` when the
/// column is missing.
#[must_use]
pub fn parse_with_column(line: &str) -> Option<RawHit<'_>> {
    let (path, rest) = split_path(line)?;
    let (line_no, rest) = take_number(rest)?;
    match take_number(rest) {
        Some((column, text)) if column > 0 => Some(RawHit {
            path,
            line: line_no,
            column: Some(column),
            text,
        }),
        _ => Some(RawHit {
            path,
            line: line_no,
            column: None,
            text: rest,
        }),
    }
}

/// Parse `path:line:text`.
#[must_use]
pub fn parse_without_column(line: &str) -> Option<RawHit<'_>> {
    let (path, rest) = split_path(line)?;
    let (line_no, text) = take_number(rest)?;
    Some(RawHit {
        path,
        line: line_no,
        column: None,
        text,
    })
}

fn split_path(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if let Some((path, rest)) = line.split_once('\0') {
        return (!path.is_empty()).then_some((path, rest));
    }

    let bytes = line.as_bytes();
    for (idx, _) in line.match_indices(':') {
        if idx == 0 {
            continue;
        }
        let digits = bytes[idx + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 && bytes.get(idx + 1 + digits) == Some(&b':') {
            return Some((&line[..idx], &line[idx + 1..]));
        }
    }
    None
}

/// Take a positive decimal number terminated by `:` or NUL.
fn take_number(s: &str) -> Option<(usize, &str)> {
    let end = s.find([':', '\0'])?;
    let digits = &s[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: usize = digits.parse().ok()?;
    if value == 0 {
        return None;
    }
    Some((value, &s[end + 1..]))
}

/// Build a [`Match`] from a parsed hit, resolving the matched substring.
///
/// When the engine reported a column the match text is read at that offset.
/// Otherwise the literal query is located in the line, which also yields the
/// column. Regex queries without a column keep an empty match text.
#[must_use]
pub fn into_match(hit: RawHit<'_>, query: &SearchQuery) -> Option<Match> {
    if hit.path.is_empty() {
        return None;
    }
    let (column, match_text) = match hit.column {
        Some(column) => (Some(column), text_at(hit.text, column, query)),
        None => match locate(hit.text, query) {
            Some((column, text)) => (Some(column), text),
            None => (None, String::new()),
        },
    };
    Some(Match {
        file_path: PathBuf::from(hit.path),
        line: hit.line,
        column,
        match_text,
        line_text: hit.text.to_string(),
    })
}

fn text_at(line: &str, column: usize, query: &SearchQuery) -> String {
    if query.regex || query.text.is_empty() {
        return String::new();
    }
    let start = column - 1;
    let end = start + query.text.len();
    match line.get(start..end) {
        Some(found) if same_text(found, &query.text, query.case_sensitive) => found.to_string(),
        _ => locate(line, query).map(|(_, t)| t).unwrap_or_default(),
    }
}

/// Find the first occurrence of a literal query in `line`.
///
/// Returns the 1-based byte column and the text as it appears in the line.
#[must_use]
pub fn locate(line: &str, query: &SearchQuery) -> Option<(usize, String)> {
    if query.regex || query.text.is_empty() {
        return None;
    }
    let haystack;
    let needle;
    let (hay, pat): (&str, &str) = if query.case_sensitive {
        (line, query.text.as_str())
    } else {
        haystack = line.to_ascii_lowercase();
        needle = query.text.to_ascii_lowercase();
        (haystack.as_str(), needle.as_str())
    };

    for (start, _) in hay.match_indices(pat) {
        let end = start + pat.len();
        if query.whole_word && !is_word_bounded(line, start, end) {
            continue;
        }
        let found = line.get(start..end)?;
        return Some((start + 1, found.to_string()));
    }
    None
}

fn same_text(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

fn is_word_bounded(line: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = line[..start].chars().next_back().is_none_or(|c| !is_word(c));
    let after = line[end..].chars().next().is_none_or(|c| !is_word(c));
    before && after
}

/// Translate a shell glob into a file-name regular expression for engines
/// that filter files by regex (`ag -G`, `pt -G`, `ack --ignore-file=match:`).
#[must_use]
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    let mut in_braces = false;
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' if !in_braces && chars.clone().any(|c| c == '}') => {
                in_braces = true;
                out.push_str("(?:");
            }
            '}' if in_braces => {
                in_braces = false;
                out.push(')');
            }
            ',' if in_braces => out.push('|'),
            '[' => {
                out.push('[');
                if chars.next_if_eq(&'!').is_some() {
                    out.push('^');
                }
            }
            ']' => out.push(c),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

/// Check that `glob` is a well-formed shell glob.
///
/// # Errors
///
/// Returns `InvalidQuery` naming the glob and what is wrong with it.
pub fn check_glob(glob: &str) -> Result<(), SearchError> {
    globset::Glob::new(glob)
        .map(drop)
        .map_err(|e| SearchError::InvalidQuery(format!("invalid glob {glob:?}: {}", e.kind())))
}

/// Search roots rendered as command-line arguments.
#[must_use]
pub fn root_args(query: &SearchQuery) -> Vec<String> {
    query
        .roots
        .iter()
        .map(|root| root.to_string_lossy().into_owned())
        .collect()
}
