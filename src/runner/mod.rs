//! Search sessions: spawning an engine and streaming its output.
//!
//! A [`SearchRunner`] owns at most one live session. Each session runs a
//! background tokio task that owns the engine process and appends parsed
//! matches to the session's [`ResultStore`]. Callers observe the session
//! through a cloneable [`SessionHandle`].

mod process;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::search::grammar::check_glob;
use crate::search::registry::EngineRegistry;
use crate::search::{EngineId, SearchError, SearchQuery};
use crate::session::SessionState;
use crate::store::ResultStore;

use process::Worker;

/// Lifecycle of one search session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Starting,
    Streaming,
    Completed { exit_code: i32 },
    Cancelled,
    Failed(SessionFailure),
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled | Self::Failed(_)
        )
    }
}

/// Why a session that had started ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    Timeout { after: Duration },
    EngineExecutionFailed { code: Option<i32>, stderr: String },
    Io(String),
}

impl SessionFailure {
    #[must_use]
    pub fn into_error(self, engine: EngineId) -> SearchError {
        match self {
            Self::Timeout { after } => SearchError::Timeout { after },
            Self::EngineExecutionFailed { code, stderr } => {
                SearchError::EngineExecutionFailed { engine, code, stderr }
            }
            Self::Io(message) => SearchError::Io { engine, message },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Upper bound on the whole session, spawn to exit.
    pub timeout: Duration,
    /// How long a terminated engine gets to exit before it is killed.
    pub grace_period: Duration,
    pub collapse_adjacent: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            grace_period: Duration::from_millis(500),
            collapse_adjacent: false,
        }
    }
}

/// Outcome of a session that completed normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: u64,
    pub engine: EngineId,
    pub exit_code: i32,
    pub matches: usize,
}

/// Read-only view of a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    engine: EngineId,
    store: ResultStore,
    status: watch::Receiver<SessionStatus>,
    pid: Option<u32>,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn engine(&self) -> EngineId {
        self.engine
    }

    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// OS process id of the engine, if it was known at spawn time.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Wait for a terminal status.
    pub async fn wait(&self) -> SessionStatus {
        let mut rx = self.status.clone();
        match rx.wait_for(SessionStatus::is_terminal).await {
            Ok(status) => status.clone(),
            Err(_) => SessionStatus::Failed(SessionFailure::Io(
                "session worker stopped without reporting a result".to_string(),
            )),
        }
    }

    /// Wait for the session and convert its outcome into a result.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Cancelled` for cancelled sessions and the
    /// matching `SearchError` for failed ones.
    pub async fn finish(&self) -> Result<SessionSummary, SearchError> {
        match self.wait().await {
            SessionStatus::Completed { exit_code } => Ok(SessionSummary {
                id: self.id,
                engine: self.engine,
                exit_code,
                matches: self.store.len(),
            }),
            SessionStatus::Cancelled => Err(SearchError::Cancelled),
            SessionStatus::Failed(failure) => Err(failure.into_error(self.engine)),
            other => Err(SearchError::Io {
                engine: self.engine,
                message: format!("session ended in non-terminal state {other:?}"),
            }),
        }
    }
}

struct ActiveSession {
    handle: SessionHandle,
    cancel: CancellationToken,
    /// Taken once the worker has been awaited.
    worker: Option<JoinHandle<()>>,
}

/// Starts search sessions, keeping at most one alive.
pub struct SearchRunner {
    registry: EngineRegistry,
    options: RunOptions,
    active: Option<ActiveSession>,
    next_id: u64,
}

impl SearchRunner {
    #[must_use]
    pub fn new(registry: EngineRegistry, options: RunOptions) -> Self {
        Self {
            registry,
            options,
            active: None,
            next_id: 1,
        }
    }

    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Options for sessions started from now on.
    pub fn options_mut(&mut self) -> &mut RunOptions {
        &mut self.options
    }

    /// Handle of the current or most recent session.
    #[must_use]
    pub fn active(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    /// Status of the current session, `Idle` when none was started.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.active().map_or(SessionStatus::Idle, SessionHandle::status)
    }

    /// Start a search, cancelling and awaiting any session still running.
    ///
    /// The engine is resolved before anything is spawned. Once the process
    /// is running the query is recorded in `state`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for an empty query, a missing root or a
    /// malformed glob. Returns `EngineNotFound`/`ExecutableNotFound` when the
    /// engine cannot be resolved and `Spawn` when the process fails to start.
    pub async fn start(
        &mut self,
        query: SearchQuery,
        state: &mut SessionState,
    ) -> Result<SessionHandle, SearchError> {
        self.cancel().await;

        if query.text.is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".to_string()));
        }
        let Some(working_dir) = query.working_dir() else {
            return Err(SearchError::InvalidQuery("no search root given".to_string()));
        };
        if !working_dir.is_dir() {
            return Err(SearchError::InvalidQuery(format!(
                "{} is not a directory",
                working_dir.display()
            )));
        }

        for glob in query.include_globs.iter().chain(&query.exclude_globs) {
            check_glob(glob)?;
        }

        let resolved = self.registry.resolve(query.engine, None)?;
        let args = resolved.adapter.build_args(&query);
        tracing::debug!(
            engine = %resolved.id,
            executable = %resolved.executable.display(),
            ?args,
            "starting search"
        );

        let mut command = Command::new(&resolved.executable);
        command
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = resolved.child_path() {
            command.env("PATH", path);
        }

        let (status_tx, status_rx) = watch::channel(SessionStatus::Starting);
        let child = command.spawn().map_err(|e| SearchError::Spawn {
            engine: query.engine,
            message: e.to_string(),
        })?;
        status_tx.send_replace(SessionStatus::Streaming);
        state.record(&query);

        let id = self.next_id;
        self.next_id += 1;
        let store = if self.options.collapse_adjacent {
            ResultStore::collapsing_adjacent()
        } else {
            ResultStore::new()
        };
        let cancel = CancellationToken::new();
        let handle = SessionHandle {
            id,
            engine: query.engine,
            store: store.clone(),
            status: status_rx,
            pid: child.id(),
        };

        let worker = Worker {
            adapter: resolved.adapter,
            query: Arc::new(query),
            child,
            store,
            status: status_tx,
            cancel: cancel.clone(),
            timeout: self.options.timeout,
            grace_period: self.options.grace_period,
        };
        let worker = tokio::spawn(worker.drive());
        tracing::info!(session = id, pid = handle.pid, "search streaming");

        self.active = Some(ActiveSession {
            handle: handle.clone(),
            cancel,
            worker: Some(worker),
        });
        Ok(handle)
    }

    /// Cancel the running session and wait until its process is gone.
    /// Finished sessions keep their terminal status.
    pub async fn cancel(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.cancel.cancel();
        let Some(worker) = active.worker.take() else {
            return;
        };
        if let Err(e) = worker.await
            && !e.is_cancelled()
        {
            tracing::error!("search worker panicked: {e}");
        }
    }
}

impl Drop for SearchRunner {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}
