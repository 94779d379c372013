//! Engine resolution: adapter lookup plus executable discovery.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::{EngineAdapter, EngineId, SearchError};

/// An engine ready to be spawned.
#[derive(Clone)]
pub struct ResolvedEngine {
    pub id: EngineId,
    pub adapter: &'static dyn EngineAdapter,
    pub executable: PathBuf,
    /// Directories prepended to the child's PATH.
    pub search_paths: Vec<PathBuf>,
}

impl std::fmt::Debug for ResolvedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedEngine")
            .field("id", &self.id)
            .field("executable", &self.executable)
            .finish_non_exhaustive()
    }
}

impl ResolvedEngine {
    /// PATH value for the child process, with the engine's extra directories first.
    #[must_use]
    pub fn child_path(&self) -> Option<OsString> {
        if self.search_paths.is_empty() {
            return None;
        }
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .search_paths
            .iter()
            .cloned()
            .chain(std::env::split_paths(&inherited));
        std::env::join_paths(dirs).ok()
    }
}

/// Resolution status of one engine, for listings.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub id: EngineId,
    pub resolved: Result<PathBuf, SearchError>,
}

/// Maps engine identifiers to adapters and executables.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    path_overrides: HashMap<EngineId, PathBuf>,
    search_paths: HashMap<EngineId, Vec<PathBuf>>,
}

impl EngineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` for `engine` instead of searching PATH.
    #[must_use]
    pub fn with_override(mut self, engine: EngineId, path: impl Into<PathBuf>) -> Self {
        self.path_overrides.insert(engine, path.into());
        self
    }

    /// Search `dirs` before PATH when locating `engine`.
    #[must_use]
    pub fn with_search_paths(mut self, engine: EngineId, dirs: Vec<PathBuf>) -> Self {
        self.search_paths.insert(engine, dirs);
        self
    }

    /// Resolve an engine by its configured name.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::EngineNotFound` for unknown names, otherwise as
    /// [`EngineRegistry::resolve`].
    pub fn resolve_named(&self, name: &str) -> Result<ResolvedEngine, SearchError> {
        self.resolve(name.parse()?, None)
    }

    /// Resolve `engine`, preferring `configured_path`, then the registry's
    /// override, then a PATH lookup. Nothing is executed.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::ExecutableNotFound` carrying the attempted path or
    /// program name when no executable file is found.
    pub fn resolve(
        &self,
        engine: EngineId,
        configured_path: Option<&Path>,
    ) -> Result<ResolvedEngine, SearchError> {
        let adapter = engine.adapter();
        let search_paths = self.search_paths.get(&engine).cloned().unwrap_or_default();
        let configured = configured_path.or_else(|| self.path_overrides.get(&engine).map(PathBuf::as_path));

        let executable = match configured {
            Some(path) if has_separator(path) => {
                if is_executable(path) {
                    Some(path.to_path_buf())
                } else {
                    None
                }
            }
            Some(name) => find_on_path(name.as_os_str(), &search_paths),
            None => find_on_path(OsStr::new(adapter.executable_name()), &search_paths),
        };

        let Some(executable) = executable else {
            let attempted = configured.map_or_else(
                || adapter.executable_name().to_string(),
                |p| p.display().to_string(),
            );
            tracing::debug!(%engine, %attempted, "executable not found");
            return Err(SearchError::ExecutableNotFound { engine, attempted });
        };

        tracing::debug!(%engine, executable = %executable.display(), "resolved engine");
        Ok(ResolvedEngine {
            id: engine,
            adapter,
            executable,
            search_paths,
        })
    }

    /// Resolution status of every supported engine.
    #[must_use]
    pub fn describe(&self) -> Vec<EngineStatus> {
        EngineId::ALL
            .into_iter()
            .map(|id| EngineStatus {
                id,
                resolved: self.resolve(id, None).map(|r| r.executable),
            })
            .collect()
    }
}

fn has_separator(path: &Path) -> bool {
    path.is_absolute() || path.components().count() > 1
}

fn find_on_path(name: &OsStr, extra: &[PathBuf]) -> Option<PathBuf> {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    extra
        .iter()
        .cloned()
        .chain(std::env::split_paths(&inherited))
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

fn candidates(dir: &Path, name: &OsStr) -> Vec<PathBuf> {
    let plain = dir.join(name);
    if cfg!(windows) && plain.extension().is_none() {
        vec![plain.with_extension("exe"), plain]
    } else {
        vec![plain]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
