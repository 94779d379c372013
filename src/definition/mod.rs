//! Find-definition searches.
//!
//! A definition search runs a fixed sequence of labelled regular expressions
//! for one symbol, one engine session per pattern. Each pattern's results are
//! collapsed to the first of adjacent lines, prefixed with the pattern label
//! and merged into a single store in pattern order. The patterns recognise
//! Haskell declarations: capitalised symbols are looked up as modules, types,
//! classes and constructors, others as values and record fields.

use crate::runner::SearchRunner;
use crate::search::{Match, SearchError, SearchQuery};
use crate::session::SessionState;
use crate::store::ResultStore;

/// One labelled pattern of a definition search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionPattern {
    pub label: &'static str,
    pub pattern: String,
}

impl DefinitionPattern {
    fn new(label: &'static str, pattern: String) -> Self {
        Self { label, pattern }
    }
}

/// The patterns that locate the definition of `symbol`, in search order.
#[must_use]
pub fn definition_patterns(symbol: &str) -> Vec<DefinitionPattern> {
    let s = escape_regex(symbol.trim());
    let capitalised = symbol
        .trim()
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() && c.is_uppercase());

    if capitalised {
        vec![
            DefinitionPattern::new("Module", format!(r"^module +({s})(\s|$)")),
            DefinitionPattern::new(
                "Type def'n",
                format!(r"^(data|newtype|type)\s+{s}(\s+[a-z]+)*\s+(=|where)(\s|$)"),
            ),
            DefinitionPattern::new(
                "Class def'n",
                format!(r"^class\s+([a-zA-Z\s.\(\),]+=>\s+)?{s}(\s+[a-z]+)*\s+where(\s|$)"),
            ),
            DefinitionPattern::new(
                "Constructor",
                format!(r"((data|newtype) .+\s* =\s* {s}(\s|$))|(\|\s* {s}(\s|$))"),
            ),
        ]
    } else {
        vec![
            DefinitionPattern::new("Value type", format!(r"^ *({s})\s+::\s+.")),
            DefinitionPattern::new("Value def'n", format!(r"^ *({s})\s+[^=$]*\s=(\s|$)")),
            DefinitionPattern::new("Record getter", format!(r" +[{{,] +({s})\s+::(\s|$)")),
        ]
    }
}

/// The query that runs `pattern` with the engine, roots and globs of `template`.
#[must_use]
pub fn pattern_query(template: &SearchQuery, pattern: &DefinitionPattern) -> SearchQuery {
    SearchQuery {
        text: pattern.pattern.clone(),
        case_sensitive: true,
        whole_word: false,
        regex: true,
        ..template.clone()
    }
}

/// Run every definition pattern for `template.text` and merge the results.
///
/// Sessions run one after another on `runner`, which is switched to
/// collapsing adjacent lines. `state` records the symbol, not the patterns.
///
/// # Errors
///
/// Returns `InvalidQuery` for a blank symbol, the first failing session's
/// error, or `Cancelled` when `interrupt` resolves first.
pub async fn find_definition(
    runner: &mut SearchRunner,
    template: &SearchQuery,
    state: &mut SessionState,
    interrupt: impl Future<Output = ()>,
) -> Result<ResultStore, SearchError> {
    if template.text.trim().is_empty() {
        return Err(SearchError::InvalidQuery("query is empty".to_string()));
    }
    runner.options_mut().collapse_adjacent = true;
    tokio::pin!(interrupt);

    let merged = ResultStore::new();
    let mut scratch = SessionState::default();
    for (n, pattern) in definition_patterns(&template.text).iter().enumerate() {
        let handle = runner.start(pattern_query(template, pattern), &mut scratch).await?;
        if n == 0 {
            state.record(template);
        }
        tokio::select! {
            _ = handle.wait() => {}
            () = &mut interrupt => {
                tracing::debug!(session = handle.id(), "definition search interrupted");
                runner.cancel().await;
                return Err(SearchError::Cancelled);
            }
        }
        let summary = handle.finish().await?;
        let added = merged.extend(
            handle
                .store()
                .snapshot()
                .iter()
                .map(|m| labelled(m, pattern.label)),
        );
        tracing::debug!(label = pattern.label, found = summary.matches, added, "pattern done");
    }
    Ok(merged)
}

fn labelled(m: &Match, label: &str) -> Match {
    Match {
        line_text: format!("{label}: {}", m.line_text.trim()),
        ..m.clone()
    }
}

/// Escape regex metacharacters shared by the engines' dialects.
fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
