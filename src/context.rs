//! Application-level state: the session registry and the staging directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::extract::StagingArea;
use crate::paths::is_archive;
use crate::registry::SessionRegistry;
use crate::session::ArchiveSession;
use crate::zip::{ArchiveBackend, ZipBackend};

/// Name of the staging directory under the system temp directory.
pub const STAGING_DIR_NAME: &str = "stagezip";

/// Entry point for opening archives.
///
/// Every session opened through a context is tracked by that context's
/// registry until it is closed, so
/// [`cleanup_all_open_sessions`](Self::cleanup_all_open_sessions) can tear
/// them all down at shutdown.
pub struct ZipContext {
    registry: Arc<SessionRegistry>,
    staging: Arc<StagingArea>,
}

impl ZipContext {
    /// Context staging into `<temp dir>/stagezip`.
    pub fn new() -> Self {
        Self::with_staging_dir(std::env::temp_dir().join(STAGING_DIR_NAME))
    }

    /// Context staging into `dir`.
    pub fn with_staging_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            staging: Arc::new(StagingArea::new(dir)),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.dir()
    }

    /// Open the ZIP archive at `path` and index its entries.
    ///
    /// # Errors
    ///
    /// [`Error::NotAnArchive`] if the name does not end in `.zip`,
    /// [`Error::OpenFailed`] if the file is missing or not a readable ZIP.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<ArchiveSession> {
        let path = path.as_ref();
        if !is_archive(path) {
            return Err(Error::NotAnArchive(path.to_path_buf()));
        }

        let backend = ZipBackend::open(path).map_err(|source| Error::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(self.open_backend(path, Box::new(backend)))
    }

    /// Wrap an already open backend in a tracked session.
    pub fn open_backend(
        &self,
        path: impl AsRef<Path>,
        backend: Box<dyn ArchiveBackend>,
    ) -> ArchiveSession {
        ArchiveSession::new(
            path.as_ref(),
            backend,
            self.registry.clone(),
            self.staging.clone(),
        )
    }

    /// Close every session still open in this context.
    ///
    /// Staged files are left in place. Returns how many sessions were closed.
    pub fn cleanup_all_open_sessions(&self) -> usize {
        let closed = self.registry.close_all();
        if closed > 0 {
            info!(closed, "closed open archives");
        }
        closed
    }

    pub fn open_session_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for ZipContext {
    fn default() -> Self {
        Self::new()
    }
}
