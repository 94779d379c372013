//! Integration tests for the projsearch library.
//!
//! These tests drive a whole session through the public API: runner, store
//! and selector together. Engines are shell scripts written into a temporary
//! directory, so the tests are unix only; the scenario against a real `grep`
//! is skipped when grep is not installed.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use projsearch::commands::{TextSurface, run_search};
use projsearch::config::Config;
use projsearch::runner::{RunOptions, SearchRunner, SessionStatus};
use projsearch::search::registry::EngineRegistry;
use projsearch::search::{EngineId, SearchError, SearchQuery};
use projsearch::selector::{InteractiveSelector, Item, Selection};
use projsearch::session::SessionState;
use tempfile::TempDir;

/// Test helper: a project directory plus a place for fake engines.
struct TestProject {
    _temp_dir: TempDir,
    pub root: PathBuf,
    bin: PathBuf,
}

impl TestProject {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("project");
        let bin = temp_dir.path().join("bin");
        fs::create_dir_all(&root).expect("Failed to create project dir");
        fs::create_dir_all(&bin).expect("Failed to create bin dir");
        Self {
            _temp_dir: temp_dir,
            root,
            bin,
        }
    }

    /// Two files containing one `TODO` each.
    fn with_todos() -> Self {
        let project = Self::new();
        fs::write(project.root.join("one.txt"), "alpha\nTODO first\n").expect("Failed to write file");
        fs::write(project.root.join("two.txt"), "// TODO second\nbeta\n").expect("Failed to write file");
        project
    }

    fn engine_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        path
    }

    fn query(&self, text: &str, engine: EngineId) -> SearchQuery {
        SearchQuery::new(text, engine, vec![self.root.clone()])
    }
}

fn options() -> RunOptions {
    RunOptions {
        timeout: Duration::from_secs(10),
        grace_period: Duration::from_millis(100),
        collapse_adjacent: false,
    }
}

fn grep_available() -> bool {
    EngineRegistry::new().resolve(EngineId::Grep, None).is_ok()
}

// =============================================================================
// Real engine scenario
// =============================================================================

#[tokio::test]
async fn grep_finds_two_todos() {
    if !grep_available() {
        eprintln!("skipping: grep not on PATH");
        return;
    }
    let project = TestProject::with_todos();
    let mut runner = SearchRunner::new(EngineRegistry::new(), options());
    let mut state = SessionState::default();

    let handle = runner
        .start(project.query("TODO", EngineId::Grep), &mut state)
        .await
        .expect("search should start");
    let summary = handle.finish().await.expect("search should complete");

    assert_eq!(summary.exit_code, 0);
    assert_eq!(summary.matches, 2);
    assert_eq!(handle.status(), SessionStatus::Completed { exit_code: 0 });

    let mut files: Vec<PathBuf> = handle
        .store()
        .snapshot()
        .iter()
        .map(|m| m.file_path.file_name().map(PathBuf::from).unwrap_or_default())
        .collect();
    files.sort();
    assert_eq!(files, [PathBuf::from("one.txt"), PathBuf::from("two.txt")]);
    assert_eq!(state.last_query, "TODO");
    assert_eq!(state.last_engine, Some(EngineId::Grep));
}

#[tokio::test]
async fn grep_whole_word_and_case() {
    if !grep_available() {
        eprintln!("skipping: grep not on PATH");
        return;
    }
    let project = TestProject::new();
    fs::write(project.root.join("a.txt"), "todo\nTODOS\nTODO\n").expect("Failed to write file");
    let mut runner = SearchRunner::new(EngineRegistry::new(), options());

    let mut query = project.query("TODO", EngineId::Grep);
    query.case_sensitive = true;
    query.whole_word = true;
    let handle = runner
        .start(query, &mut SessionState::default())
        .await
        .expect("search should start");
    handle.finish().await.expect("search should complete");

    let lines: Vec<usize> = handle.store().snapshot().iter().map(|m| m.line).collect();
    assert_eq!(lines, [3]);
}

// =============================================================================
// Session, store and selector together
// =============================================================================

#[tokio::test]
async fn selector_follows_a_streaming_session() {
    let project = TestProject::new();
    let script = project.engine_script(
        "ag",
        "echo 'src/main.rs:3:5:    TODO wire up'\n\
         echo 'src/lib.rs:10:1:TODO docs'\n\
         echo 'src/main.rs:3:5:    TODO wire up'",
    );
    let registry = EngineRegistry::new().with_override(EngineId::SilverSearcher, &script);
    let mut runner = SearchRunner::new(registry, options());

    let handle = runner
        .start(
            project.query("TODO", EngineId::SilverSearcher),
            &mut SessionState::default(),
        )
        .await
        .expect("search should start");
    handle.finish().await.expect("search should complete");

    let mut selector = InteractiveSelector::new(handle.store().clone(), &[project.root.clone()]);
    let labels: Vec<String> = selector.items().iter().map(|i| i.label().to_string()).collect();
    assert_eq!(
        labels,
        [
            "src/main.rs:3: TODO wire up",
            "src/lib.rs:10: TODO docs",
            "List results in view"
        ]
    );

    selector.set_filter("lib");
    assert_eq!(selector.len(), 2);
    match selector.activate(0) {
        Some(Selection::Navigate(request)) => {
            assert_eq!(request.file_path, project.root.join("src/lib.rs"));
            assert_eq!(request.line, 10);
            assert_eq!(request.column, Some(1));
        }
        other => panic!("unexpected selection: {other:?}"),
    }

    match selector.activate(1) {
        Some(Selection::ShowResultsView(all)) => assert_eq!(all.len(), 2),
        other => panic!("unexpected selection: {other:?}"),
    }
    assert!(matches!(selector.items().last(), Some(Item::ListInView)));
}

#[tokio::test]
async fn results_view_through_text_surface() {
    let project = TestProject::new();
    let script = project.engine_script("grep", "echo 'a.rs:1:TODO'\necho 'b.rs:4:x TODO'");
    let registry = EngineRegistry::new().with_override(EngineId::Grep, &script);
    let mut runner = SearchRunner::new(registry, options());

    let handle = runner
        .start(project.query("TODO", EngineId::Grep), &mut SessionState::default())
        .await
        .expect("search should start");
    handle.finish().await.expect("search should complete");

    let mut selector = InteractiveSelector::new(handle.store().clone(), &[project.root.clone()]);
    let last = selector.len() - 1;
    let mut surface = TextSurface::new("TODO", &project.root);
    selector
        .activate(last)
        .expect("list-in-view entry")
        .deliver(&mut surface)
        .expect("text surface never fails");

    assert!(surface.out.starts_with("Search results for \"TODO\" (2 lines in 2 files):"));
    assert!(surface.out.contains("  4:3: x TODO"));
}

// =============================================================================
// Cancellation and interrupts
// =============================================================================

#[tokio::test]
async fn interrupt_cancels_running_search() {
    let project = TestProject::new();
    let script = project.engine_script("grep", "exec sleep 30");
    let registry = EngineRegistry::new().with_override(EngineId::Grep, &script);
    let mut runner = SearchRunner::new(registry, options());
    let mut state = SessionState::default();

    let result = run_search(
        &mut runner,
        project.query("TODO", EngineId::Grep),
        &mut state,
        tokio::time::sleep(Duration::from_millis(200)),
    )
    .await;

    assert!(matches!(result, Err(SearchError::Cancelled)));
    assert_eq!(runner.status(), SessionStatus::Cancelled);
    assert_eq!(SearchError::Cancelled.exit_code(), 130);
}

#[tokio::test]
async fn second_search_replaces_first() {
    let project = TestProject::new();
    let script = project.engine_script("grep", "echo 'a.rs:1:TODO'\nexec sleep 30");
    let registry = EngineRegistry::new().with_override(EngineId::Grep, &script);
    let mut runner = SearchRunner::new(registry, options());
    let mut state = SessionState::default();

    let first = runner
        .start(project.query("TODO", EngineId::Grep), &mut state)
        .await
        .expect("first search should start");
    let second = runner
        .start(project.query("FIXME", EngineId::Grep), &mut state)
        .await
        .expect("second search should start");

    assert_eq!(first.status(), SessionStatus::Cancelled);
    assert_eq!(second.status(), SessionStatus::Streaming);
    assert_eq!(state.last_query, "FIXME");
    runner.cancel().await;
    assert_eq!(second.status(), SessionStatus::Cancelled);
}

// =============================================================================
// Configuration-driven setup
// =============================================================================

#[tokio::test]
async fn config_overrides_reach_the_engine() {
    let project = TestProject::new();
    // Print the arguments so the test can see what the engine received.
    let script = project.engine_script(
        "ack",
        "n=0\nfor arg in \"$@\"; do n=$((n + 1)); echo \"args.txt:$n:1:$arg\"; done",
    );
    let config_path = project.root.join("config.toml");
    fs::write(
        &config_path,
        format!(
            "whole_word = true\n\
             [engine_path_overrides]\nack = '{}'\n\
             [engine_extra_args]\nack = ['--follow']\n",
            script.display()
        ),
    )
    .expect("Failed to write config");
    let config = Config::load_from(&config_path).expect("config should load");

    let mut runner = SearchRunner::new(
        config.registry().expect("registry"),
        config.run_options(),
    );
    let query = config.query("needle here", EngineId::Ack, vec![project.root.clone()]);
    let handle = runner
        .start(query, &mut SessionState::default())
        .await
        .expect("search should start");
    handle.finish().await.expect("search should complete");

    let args: Vec<String> = handle
        .store()
        .snapshot()
        .iter()
        .map(|m| m.line_text.clone())
        .collect();
    assert!(args.contains(&"-w".to_string()));
    assert!(args.contains(&"--follow".to_string()));
    assert!(args.contains(&"needle here".to_string()));
}

#[test]
fn session_state_survives_a_restart() {
    let project = TestProject::new();
    let path = project.root.join("state.json");
    let mut state = SessionState::default();
    state.record(&project.query("TODO", EngineId::GitGrep));
    state.save(&path).expect("state should save");

    let reloaded = SessionState::load(&path);
    assert_eq!(reloaded.prompt_default(None), "TODO");
    assert_eq!(reloaded.last_engine, Some(EngineId::GitGrep));
}
