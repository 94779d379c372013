//! Background worker that streams one engine process into a result store.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{SessionFailure, SessionStatus};
use crate::search::{EngineAdapter, ExitDisposition, LineMode, SearchQuery};
use crate::store::ResultStore;

/// Why streaming stopped before the engine finished.
#[derive(Debug, Clone, Copy)]
enum Interrupt {
    Cancelled,
    TimedOut,
}

enum ReadEvent {
    Line,
    Eof,
    Failed(std::io::Error),
    Interrupted(Interrupt),
}

enum ExitEvent {
    Exited(std::io::Result<ExitStatus>),
    Interrupted(Interrupt),
}

pub(super) struct Worker {
    pub(super) adapter: &'static dyn EngineAdapter,
    pub(super) query: Arc<SearchQuery>,
    pub(super) child: Child,
    pub(super) store: ResultStore,
    pub(super) status: watch::Sender<SessionStatus>,
    pub(super) cancel: CancellationToken,
    pub(super) timeout: Duration,
    pub(super) grace_period: Duration,
}

impl Worker {
    /// Stream output until the engine exits, the session is cancelled or the
    /// deadline passes, then publish the terminal status.
    pub(super) async fn drive(mut self) {
        let status = self.run().await;
        match &status {
            SessionStatus::Completed { exit_code } => tracing::info!(
                engine = self.adapter.executable_name(),
                exit_code,
                matches = self.store.len(),
                "search completed"
            ),
            SessionStatus::Cancelled => tracing::debug!("search cancelled"),
            other => tracing::warn!(status = ?other, "search failed"),
        }
        self.status.send_replace(status);
    }

    async fn run(&mut self) -> SessionStatus {
        let deadline = Instant::now() + self.timeout;

        let Some(stdout) = self.child.stdout.take() else {
            self.terminate().await;
            return SessionStatus::Failed(SessionFailure::Io("stdout was not captured".into()));
        };
        let stderr_task = self.child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut bytes = Vec::new();
                let _ = stderr.read_to_end(&mut bytes).await;
                String::from_utf8_lossy(&bytes).trim().to_string()
            })
        });

        let mut buffered = Vec::new();
        if let Err(status) = self.stream(stdout, deadline, &mut buffered).await {
            abort(stderr_task);
            return status;
        }

        let exit = tokio::select! {
            biased;
            () = self.cancel.cancelled() => ExitEvent::Interrupted(Interrupt::Cancelled),
            () = tokio::time::sleep_until(deadline) => ExitEvent::Interrupted(Interrupt::TimedOut),
            status = self.child.wait() => ExitEvent::Exited(status),
        };
        let status = match exit {
            ExitEvent::Interrupted(interrupt) => {
                self.terminate().await;
                abort(stderr_task);
                return self.interrupted(interrupt);
            }
            ExitEvent::Exited(Err(e)) => {
                abort(stderr_task);
                return SessionStatus::Failed(SessionFailure::Io(e.to_string()));
            }
            ExitEvent::Exited(Ok(status)) => status,
        };

        match status.code() {
            Some(code) if self.adapter.exit_disposition(code) == ExitDisposition::Success => {
                for line in &buffered {
                    self.accept(line);
                }
                abort(stderr_task);
                SessionStatus::Completed { exit_code: code }
            }
            code => {
                let stderr = self.collect_stderr(stderr_task).await;
                SessionStatus::Failed(SessionFailure::EngineExecutionFailed { code, stderr })
            }
        }
    }

    /// Read stdout line by line. Returns `Err` with the terminal status when
    /// streaming was interrupted; the process is already gone in that case.
    async fn stream(
        &mut self,
        stdout: ChildStdout,
        deadline: Instant,
        buffered: &mut Vec<String>,
    ) -> Result<(), SessionStatus> {
        let mode = self.adapter.line_mode();
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => ReadEvent::Interrupted(Interrupt::Cancelled),
                () = tokio::time::sleep_until(deadline) => ReadEvent::Interrupted(Interrupt::TimedOut),
                read = reader.read_until(b'\n', &mut buf) => match read {
                    Ok(0) => ReadEvent::Eof,
                    Ok(_) => ReadEvent::Line,
                    Err(e) => ReadEvent::Failed(e),
                },
            };

            match event {
                ReadEvent::Line => match decode_line(&buf) {
                    Some(line) if mode == LineMode::PerLine => self.accept(line),
                    Some(line) => buffered.push(line.to_string()),
                    None => tracing::trace!("dropped undecodable output line"),
                },
                ReadEvent::Eof => return Ok(()),
                ReadEvent::Failed(e) => {
                    drop(reader);
                    self.terminate().await;
                    return Err(SessionStatus::Failed(SessionFailure::Io(e.to_string())));
                }
                ReadEvent::Interrupted(interrupt) => {
                    // A closed pipe also stops engines that ignore SIGTERM on their next write.
                    drop(reader);
                    self.terminate().await;
                    return Err(self.interrupted(interrupt));
                }
            }
        }
    }

    fn accept(&self, line: &str) {
        match self.adapter.parse_line(line, &self.query) {
            Some(m) => {
                self.store.push(m);
            }
            None => tracing::trace!(line, "skipped line outside engine grammar"),
        }
    }

    fn interrupted(&self, interrupt: Interrupt) -> SessionStatus {
        match interrupt {
            Interrupt::Cancelled => SessionStatus::Cancelled,
            Interrupt::TimedOut => SessionStatus::Failed(SessionFailure::Timeout {
                after: self.timeout,
            }),
        }
    }

    /// Ask the engine to stop, give it the grace period to exit, then kill
    /// it. Either way the process is reaped before this returns.
    async fn terminate(&mut self) {
        request_stop(&self.child);
        match tokio::time::timeout(self.grace_period, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "engine exited within the grace period"),
            _ => {
                tracing::debug!(pid = self.child.id(), "killing engine process");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("failed to kill engine process: {e}");
                }
            }
        }
    }

    async fn collect_stderr(&self, task: Option<JoinHandle<String>>) -> String {
        let Some(task) = task else {
            return String::new();
        };
        match tokio::time::timeout(self.grace_period, task).await {
            Ok(Ok(stderr)) => stderr,
            _ => String::new(),
        }
    }
}

/// Send SIGTERM to a running engine.
#[cfg(unix)]
fn request_stop(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        tracing::debug!(pid, "could not signal engine process: {e}");
    }
}

/// Windows has no polite stop for console tools; closing stdout is all there is.
#[cfg(not(unix))]
fn request_stop(_child: &Child) {}

fn abort(task: Option<JoinHandle<String>>) {
    if let Some(task) = task {
        task.abort();
    }
}

/// Decode one raw output line, dropping the terminator. Lines that are not
/// valid UTF-8 are rejected.
fn decode_line(raw: &[u8]) -> Option<&str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).ok()
}
