//! Fuzzy-filterable result list.
//!
//! The selector reads a session's [`ResultStore`], renders each match as a
//! display line and filters those lines as the user types. It never touches
//! files: picking an entry produces a [`Selection`] that an [`EditorSurface`]
//! carries out.

pub mod view;

use std::io;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use frizbee::{Config, match_indices, match_list};

use crate::search::Match;
use crate::store::ResultStore;

/// Label of the entry that lists every result in a view.
pub const LIST_IN_VIEW: &str = "List results in view";

/// Longest line text shown in the list, in characters.
pub const MAX_LINE_TEXT: usize = 1000;

/// Where the editor should go for a selected match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateRequest {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: Option<usize>,
}

/// Result of activating a list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Navigate(NavigateRequest),
    /// The full ordered result set.
    ShowResultsView(Vec<Match>),
}

/// The editor that navigation and results views are delegated to.
pub trait EditorSurface {
    /// Open `request.file_path` at the given position.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn navigate(&mut self, request: &NavigateRequest) -> io::Result<()>;

    /// Show all matches at once.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn show_results_view(&mut self, matches: &[Match]) -> io::Result<()>;
}

impl Selection {
    /// Hand the selection to `surface`.
    ///
    /// # Errors
    ///
    /// Propagates the surface's error.
    pub fn deliver(&self, surface: &mut dyn EditorSurface) -> io::Result<()> {
        match self {
            Self::Navigate(request) => surface.navigate(request),
            Self::ShowResultsView(matches) => surface.show_results_view(matches),
        }
    }
}

/// One visible entry of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Result {
        display: String,
        /// Byte range of the matched text within `display`.
        match_span: Option<Range<usize>>,
        /// Positions in `display` matched by the filter.
        filter_hits: Vec<usize>,
    },
    ListInView,
}

impl Item {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Result { display, .. } => display,
            Self::ListInView => LIST_IN_VIEW,
        }
    }
}

struct Row {
    item: Arc<Match>,
    display: String,
    match_span: Option<Range<usize>>,
}

pub struct InteractiveSelector {
    store: ResultStore,
    working_dir: PathBuf,
    common_root: PathBuf,
    rows: Vec<Row>,
    filter: String,
    /// Indices into `rows` that pass the filter, in arrival order.
    visible: Vec<usize>,
    /// Row of the last navigated match, for `next_result`/`prev_result`.
    cursor: Option<usize>,
}

impl InteractiveSelector {
    /// Build a selector over `store` for a search of `roots`. Relative match
    /// paths are taken relative to the first root.
    #[must_use]
    pub fn new(store: ResultStore, roots: &[PathBuf]) -> Self {
        let mut selector = Self {
            store,
            working_dir: roots.first().cloned().unwrap_or_default(),
            common_root: common_root(roots),
            rows: Vec::new(),
            filter: String::new(),
            visible: Vec::new(),
            cursor: None,
        };
        selector.refresh();
        selector
    }

    #[must_use]
    pub fn common_root(&self) -> &Path {
        &self.common_root
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Pull matches stored since the last refresh, returning how many arrived.
    pub fn refresh(&mut self) -> usize {
        let start = self.rows.len();
        let fresh = self.store.since(start);
        let count = fresh.len();
        for item in fresh {
            let row = self.render(item);
            self.rows.push(row);
        }
        let matched = self.filter_rows(start);
        self.visible.extend(matched);
        count
    }

    /// Replace the filter text and recompute the visible rows.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_string();
        self.visible = self.filter_rows(0);
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Visible entries, including the trailing list-in-view action.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        let config = filter_config();
        self.visible
            .iter()
            .map(|&i| {
                let row = &self.rows[i];
                let filter_hits = if self.filter.is_empty() {
                    Vec::new()
                } else {
                    match_indices(&self.filter, &row.display, &config)
                        .map(|m| m.indices)
                        .unwrap_or_default()
                };
                Item::Result {
                    display: row.display.clone(),
                    match_span: row.match_span.clone(),
                    filter_hits,
                }
            })
            .chain(std::iter::once(Item::ListInView))
            .collect()
    }

    /// Number of entries, the list-in-view action included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len() + 1
    }

    /// Number of results received, filtered or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Whether no result passes the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Activate the entry at `index` as listed by [`items`](Self::items).
    pub fn activate(&mut self, index: usize) -> Option<Selection> {
        if index == self.visible.len() {
            self.refresh();
            return Some(Selection::ShowResultsView(self.store.to_vec()));
        }
        let row = *self.visible.get(index)?;
        self.cursor = Some(row);
        Some(Selection::Navigate(self.navigate_request(row)))
    }

    /// Navigate to the result after the last one navigated to.
    pub fn next_result(&mut self) -> Option<NavigateRequest> {
        self.refresh();
        let row = self.cursor.map_or(0, |c| c + 1);
        self.step_to(row)
    }

    /// Navigate to the result before the last one navigated to.
    pub fn prev_result(&mut self) -> Option<NavigateRequest> {
        let row = self.cursor?.checked_sub(1)?;
        self.step_to(row)
    }

    fn step_to(&mut self, row: usize) -> Option<NavigateRequest> {
        if row >= self.rows.len() {
            return None;
        }
        self.cursor = Some(row);
        Some(self.navigate_request(row))
    }

    fn navigate_request(&self, row: usize) -> NavigateRequest {
        let m = &self.rows[row].item;
        NavigateRequest {
            file_path: self.working_dir.join(&m.file_path),
            line: m.line,
            column: m.column,
        }
    }

    fn render(&self, item: Arc<Match>) -> Row {
        let absolute = self.working_dir.join(&item.file_path);
        let path = absolute
            .strip_prefix(&self.common_root)
            .unwrap_or(&item.file_path);
        let prefix = format!("{}:{}: ", path.display(), item.line);

        let leading = item.line_text.len() - item.line_text.trim_start().len();
        let text: String = item.line_text.trim().chars().take(MAX_LINE_TEXT).collect();
        let display = format!("{prefix}{text}");

        let match_span = item.column.and_then(|column| {
            if item.match_text.is_empty() {
                return None;
            }
            let start = prefix.len() + column.checked_sub(1)?.checked_sub(leading)?;
            let end = start + item.match_text.len();
            display
                .get(start..end)
                .is_some_and(|s| s == item.match_text || s.eq_ignore_ascii_case(&item.match_text))
                .then_some(start..end)
        });

        Row {
            item,
            display,
            match_span,
        }
    }

    /// Indices of rows from `start` on that pass the current filter.
    fn filter_rows(&self, start: usize) -> Vec<usize> {
        if self.filter.is_empty() {
            return (start..self.rows.len()).collect();
        }
        let haystacks: Vec<&str> = self.rows[start..]
            .iter()
            .map(|row| row.display.as_str())
            .collect();
        let mut matched: Vec<usize> = match_list(&self.filter, &haystacks, &filter_config())
            .into_iter()
            .filter(|m| m.score > 0)
            .map(|m| start + m.index as usize)
            .collect();
        matched.sort_unstable();
        matched
    }
}

fn filter_config() -> Config {
    Config {
        prefilter: true,
        max_typos: Some(0),
        sort: false,
        ..Config::default()
    }
}

/// Longest shared leading path of `roots`.
fn common_root(roots: &[PathBuf]) -> PathBuf {
    let Some((first, rest)) = roots.split_first() else {
        return PathBuf::new();
    };
    let mut shared: Vec<Component<'_>> = first.components().collect();
    for root in rest {
        let len = shared
            .iter()
            .zip(root.components())
            .take_while(|(a, b)| *a == b)
            .count();
        shared.truncate(len);
    }
    shared.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file: &str, line: usize, column: Option<usize>, match_text: &str, text: &str) -> Match {
        Match {
            file_path: PathBuf::from(file),
            line,
            column,
            match_text: match_text.to_string(),
            line_text: text.to_string(),
        }
    }

    fn selector_with(matches: Vec<Match>) -> InteractiveSelector {
        let store = ResultStore::new();
        store.extend(matches);
        InteractiveSelector::new(store, &[PathBuf::from("/proj")])
    }

    mod display {
        use super::*;

        #[test]
        fn path_line_and_trimmed_text() {
            let selector = selector_with(vec![hit("src/a.rs", 4, Some(8), "TODO", "    // TODO fix  ")]);
            let items = selector.items();
            assert_eq!(items[0].label(), "src/a.rs:4: // TODO fix");
            match &items[0] {
                Item::Result { display, match_span, .. } => {
                    let span = match_span.clone().unwrap();
                    assert_eq!(&display[span], "TODO");
                }
                Item::ListInView => panic!("expected a result"),
            }
        }

        #[test]
        fn long_lines_are_truncated() {
            let long = "x".repeat(MAX_LINE_TEXT + 50);
            let selector = selector_with(vec![hit("a", 1, None, "", &long)]);
            let label = selector.items()[0].label().to_string();
            assert_eq!(label.len(), "a:1: ".len() + MAX_LINE_TEXT);
        }

        #[test]
        fn paths_are_relative_to_common_root() {
            let store = ResultStore::new();
            store.push(hit("/work/app/src/main.rs", 1, None, "", "fn main"));
            let roots = [PathBuf::from("/work/app"), PathBuf::from("/work/lib")];
            let selector = InteractiveSelector::new(store, &roots);
            assert_eq!(selector.common_root(), Path::new("/work"));
            assert_eq!(selector.items()[0].label(), "app/src/main.rs:1: fn main");
        }

        #[test]
        fn list_in_view_is_always_last() {
            let selector = selector_with(Vec::new());
            assert_eq!(selector.items(), [Item::ListInView]);
            assert_eq!(selector.len(), 1);
            assert!(selector.is_empty());
        }
    }

    mod filtering {
        use super::*;

        fn sample() -> InteractiveSelector {
            selector_with(vec![
                hit("src/parser.rs", 10, None, "", "TODO parse"),
                hit("src/lexer.rs", 2, None, "", "TODO lex"),
                hit("README.md", 7, None, "", "TODO docs"),
            ])
        }

        #[test]
        fn subsequence_filter_keeps_arrival_order() {
            let mut selector = sample();
            selector.set_filter("src");
            let labels: Vec<String> = selector.items().iter().map(|i| i.label().to_string()).collect();
            assert_eq!(
                labels,
                ["src/parser.rs:10: TODO parse", "src/lexer.rs:2: TODO lex", LIST_IN_VIEW]
            );
        }

        #[test]
        fn filter_hits_are_reported() {
            let mut selector = sample();
            selector.set_filter("docs");
            let items = selector.items();
            assert_eq!(items.len(), 2);
            match &items[0] {
                Item::Result { filter_hits, .. } => assert_eq!(filter_hits.len(), 4),
                Item::ListInView => panic!("expected a result"),
            }
        }

        #[test]
        fn clearing_the_filter_restores_everything() {
            let mut selector = sample();
            selector.set_filter("zzzz");
            assert!(selector.is_empty());
            selector.set_filter("");
            assert_eq!(selector.len(), 4);
        }

        #[test]
        fn refresh_applies_filter_to_new_matches() {
            let store = ResultStore::new();
            store.push(hit("src/a.rs", 1, None, "", "TODO"));
            let mut selector = InteractiveSelector::new(store.clone(), &[PathBuf::from("/p")]);
            selector.set_filter("lib");

            store.push(hit("lib/b.rs", 2, None, "", "TODO"));
            store.push(hit("src/c.rs", 3, None, "", "TODO"));
            assert_eq!(selector.refresh(), 2);
            assert_eq!(selector.items()[0].label(), "lib/b.rs:2: TODO");
            assert_eq!(selector.len(), 2);
        }
    }

    mod activation {
        use super::*;

        #[derive(Default)]
        struct Recorder {
            navigated: Vec<NavigateRequest>,
            views: Vec<usize>,
        }

        impl EditorSurface for Recorder {
            fn navigate(&mut self, request: &NavigateRequest) -> io::Result<()> {
                self.navigated.push(request.clone());
                Ok(())
            }

            fn show_results_view(&mut self, matches: &[Match]) -> io::Result<()> {
                self.views.push(matches.len());
                Ok(())
            }
        }

        #[test]
        fn result_resolves_to_navigate_request() {
            let mut selector = selector_with(vec![hit("src/a.rs", 3, Some(5), "TODO", "    TODO")]);
            let selection = selector.activate(0).unwrap();
            assert_eq!(
                selection,
                Selection::Navigate(NavigateRequest {
                    file_path: PathBuf::from("/proj/src/a.rs"),
                    line: 3,
                    column: Some(5),
                })
            );

            let mut surface = Recorder::default();
            selection.deliver(&mut surface).unwrap();
            assert_eq!(surface.navigated.len(), 1);
        }

        #[test]
        fn list_in_view_yields_full_snapshot() {
            let mut selector = selector_with(vec![
                hit("a", 1, None, "", "x"),
                hit("b", 2, None, "", "y"),
            ]);
            selector.set_filter("b");
            let last = selector.len() - 1;
            let selection = selector.activate(last).unwrap();
            match &selection {
                Selection::ShowResultsView(all) => {
                    assert_eq!(all.len(), 2);
                    assert_eq!(all[0].file_path, PathBuf::from("a"));
                }
                Selection::Navigate(_) => panic!("expected the results view"),
            }

            let mut surface = Recorder::default();
            selection.deliver(&mut surface).unwrap();
            assert_eq!(surface.views, [2]);
        }

        #[test]
        fn out_of_range_is_none() {
            let mut selector = selector_with(vec![hit("a", 1, None, "", "x")]);
            assert!(selector.activate(5).is_none());
        }

        #[test]
        fn next_and_prev_walk_results() {
            let mut selector = selector_with(vec![
                hit("a", 1, None, "", "x"),
                hit("a", 5, None, "", "x"),
                hit("b", 2, None, "", "x"),
            ]);
            assert!(selector.prev_result().is_none());
            assert_eq!(selector.next_result().unwrap().line, 1);
            assert_eq!(selector.next_result().unwrap().line, 5);
            assert_eq!(selector.next_result().unwrap().line, 2);
            assert!(selector.next_result().is_none());
            assert_eq!(selector.prev_result().unwrap().line, 5);

            selector.activate(0);
            assert_eq!(selector.next_result().unwrap().line, 5);
        }
    }
}
