//! Command implementations behind the CLI.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use crate::cli::SearchArgs;
use crate::config::Config;
use crate::definition::find_definition;
use crate::runner::{SearchRunner, SessionHandle};
use crate::search::{Capabilities, EngineId, Match, SearchError, SearchQuery};
use crate::selector::view::format_results_view;
use crate::selector::{EditorSurface, InteractiveSelector, NavigateRequest};
use crate::session::SessionState;

/// Parse a comma-separated list into a vector.
///
/// Splits the input on commas, trims whitespace, and filters out empty strings.
#[must_use]
pub fn parse_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Build the query for a `search` invocation.
///
/// Flags override the config file. A missing query falls back to the last
/// query in `state`, and to its engine unless `--engine` is given. Relative
/// paths are taken from the current directory.
///
/// # Errors
///
/// Returns an error if there is neither a query nor a previous search, or
/// the current directory cannot be determined.
pub fn build_query(
    args: &SearchArgs,
    config: &Config,
    state: &SessionState,
) -> anyhow::Result<SearchQuery> {
    let text = match args.query.as_deref() {
        Some(text) => text.to_string(),
        None => state.prompt_default(None).to_string(),
    };
    if text.is_empty() {
        anyhow::bail!("No query given and no previous search to repeat");
    }

    let cwd = std::env::current_dir()?;
    let roots = if args.paths.is_empty() {
        vec![cwd]
    } else {
        args.paths.iter().map(|p| cwd.join(p)).collect()
    };

    let repeated = args.query.is_none().then_some(state.last_engine).flatten();
    let engine = args.engine.or(repeated).unwrap_or(config.engine);
    let mut query = config.query(&text, engine, roots);
    query.case_sensitive |= args.case_sensitive;
    query.whole_word |= args.whole_word;
    query.regex |= args.regex;
    if args.include.is_some() {
        query.include_globs = parse_list(args.include.as_deref());
    }
    if args.exclude.is_some() {
        query.exclude_globs = parse_list(args.exclude.as_deref());
    }
    Ok(query)
}

/// Run one search to completion, cancelling it if `interrupt` resolves first.
///
/// # Errors
///
/// Returns the session's `SearchError`: resolution and spawn failures,
/// `EngineExecutionFailed`, `Timeout`, or `Cancelled` after an interrupt.
pub async fn run_search(
    runner: &mut SearchRunner,
    query: SearchQuery,
    state: &mut SessionState,
    interrupt: impl Future<Output = ()>,
) -> Result<SessionHandle, SearchError> {
    let handle = runner.start(query, state).await?;
    tokio::select! {
        _ = handle.wait() => {}
        () = interrupt => {
            tracing::debug!(session = handle.id(), "interrupted");
            runner.cancel().await;
        }
    }
    handle.finish().await?;
    Ok(handle)
}

/// Text output of a `search` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// What goes to stdout.
    pub output: String,
    /// The search completed without a single match.
    pub no_results: bool,
}

/// Search the project as described by `args`.
///
/// # Errors
///
/// Returns an error if config loading fails, the query cannot be built,
/// the search fails, or `--select` names no entry.
pub fn search(args: &SearchArgs) -> anyhow::Result<SearchReport> {
    let config = Config::load()?;
    let state_path = SessionState::default_path();
    let mut state = state_path
        .as_deref()
        .map(SessionState::load)
        .unwrap_or_default();

    let query = build_query(args, &config, &state)?;
    let roots = query.roots.clone();
    let text = query.text.clone();

    let mut options = config.run_options();
    if let Some(seconds) = args.timeout {
        if seconds == 0 {
            anyhow::bail!("--timeout must be positive");
        }
        options.timeout = std::time::Duration::from_secs(seconds);
    }
    options.collapse_adjacent |= args.collapse_adjacent;
    let mut runner = SearchRunner::new(config.registry()?, options);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        if args.definition {
            find_definition(&mut runner, &query, &mut state, ctrl_c()).await
        } else {
            run_search(&mut runner, query, &mut state, ctrl_c())
                .await
                .map(|handle| handle.store().clone())
        }
    });
    let outcome = match result {
        Ok(store) => {
            let mut selector = InteractiveSelector::new(store, &roots);
            if let Some(filter) = &args.filter {
                selector.set_filter(filter);
            }
            render(&mut selector, &text, args, &config)
        }
        Err(e) => Err(e.into()),
    };

    if let Some(path) = &state_path
        && let Err(e) = state.save(path)
    {
        tracing::warn!(path = %path.display(), "could not save session state: {e}");
    }
    outcome
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn render(
    selector: &mut InteractiveSelector,
    query: &str,
    args: &SearchArgs,
    config: &Config,
) -> anyhow::Result<SearchReport> {
    let mut surface = TextSurface::new(query, selector.working_dir());
    let no_results = selector.total() == 0;

    if let Some(n) = args.select {
        let selection = n
            .checked_sub(1)
            .and_then(|index| selector.activate(index))
            .ok_or_else(|| anyhow::anyhow!("No entry {n}: the list has {} entries", selector.len()))?;
        selection.deliver(&mut surface)?;
    } else if (args.list || config.show_list_by_default) && !no_results {
        let last = selector.len() - 1;
        if let Some(selection) = selector.activate(last) {
            selection.deliver(&mut surface)?;
        }
    } else {
        for item in selector.items().iter().take(selector.len() - 1) {
            let _ = writeln!(surface.out, "{}", item.label());
        }
    }

    Ok(SearchReport {
        output: surface.out,
        no_results,
    })
}

/// Editor surface that renders selections as text.
#[derive(Debug)]
pub struct TextSurface {
    query: String,
    working_dir: PathBuf,
    pub out: String,
}

impl TextSurface {
    #[must_use]
    pub fn new(query: &str, working_dir: &Path) -> Self {
        Self {
            query: query.to_string(),
            working_dir: working_dir.to_path_buf(),
            out: String::new(),
        }
    }
}

impl EditorSurface for TextSurface {
    /// Writes `path:line[:column]`, the form editors accept as a jump target.
    fn navigate(&mut self, request: &NavigateRequest) -> io::Result<()> {
        let _ = write!(self.out, "{}:{}", request.file_path.display(), request.line);
        if let Some(column) = request.column {
            let _ = write!(self.out, ":{column}");
        }
        self.out.push('\n');
        Ok(())
    }

    fn show_results_view(&mut self, matches: &[Match]) -> io::Result<()> {
        self.out
            .push_str(&format_results_view(&self.query, matches, &self.working_dir));
        Ok(())
    }
}

/// One row of `projsearch engines`.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub id: EngineId,
    pub capabilities: Capabilities,
    pub resolved: Result<PathBuf, SearchError>,
}

impl EngineInfo {
    /// Names of the query options this engine honours.
    #[must_use]
    pub fn supported_options(&self) -> Vec<&'static str> {
        let c = self.capabilities;
        [
            (c.case_sensitivity, "case"),
            (c.whole_word, "word"),
            (c.literal, "literal"),
            (c.include_globs, "include"),
            (c.exclude_globs, "exclude"),
            (c.reports_column, "column"),
        ]
        .into_iter()
        .filter_map(|(supported, name)| supported.then_some(name))
        .collect()
    }
}

/// Resolution status of every engine under the current config.
///
/// # Errors
///
/// Returns an error if config loading fails.
pub fn engines() -> anyhow::Result<Vec<EngineInfo>> {
    let config = Config::load()?;
    Ok(config
        .registry()?
        .describe()
        .into_iter()
        .map(|status| EngineInfo {
            id: status.id,
            capabilities: status.id.adapter().capabilities(),
            resolved: status.resolved,
        })
        .collect())
}
