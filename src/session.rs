//! Open archives and their entry index.
//!
//! An [`ArchiveSession`] owns one [`ArchiveBackend`]. The entry index is
//! built once when the session is created and never re-read. Closing
//! releases the backend exactly once and removes the session from its
//! [`SessionRegistry`]; every later operation fails with
//! [`Error::SessionClosed`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::StagingArea;
use crate::paths::normalize_path;
use crate::registry::{SessionId, SessionRegistry};
use crate::zip::{ArchiveBackend, EntryInfo};

/// One entry of an archive, as indexed at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full path inside the archive, `/` separated
    pub name: String,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub is_directory: bool,
    /// Position of the record in the backend
    pub(crate) index: usize,
}

impl ArchiveEntry {
    fn from_info(index: usize, info: EntryInfo) -> Self {
        let name = normalize_path(&info.name);
        let is_directory = name.ends_with('/');
        Self {
            name,
            uncompressed_size: info.uncompressed_size,
            compressed_size: info.compressed_size,
            is_directory,
            index,
        }
    }
}

/// Mutable part of a session, shared with the registry so it can close it.
pub(crate) struct SessionState {
    backend: Option<Box<dyn ArchiveBackend>>,
}

impl SessionState {
    pub(crate) fn backend(&mut self) -> Result<&mut dyn ArchiveBackend> {
        match self.backend.as_mut() {
            Some(backend) => Ok(backend.as_mut()),
            None => Err(Error::SessionClosed),
        }
    }

    /// Drop the backend. Returns whether this call released it.
    pub(crate) fn release(&mut self) -> bool {
        self.backend.take().is_some()
    }
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open archive.
///
/// Dropping the session closes it.
pub struct ArchiveSession {
    id: SessionId,
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
    state: SharedState,
    registry: Arc<SessionRegistry>,
    pub(crate) staging: Arc<StagingArea>,
}

impl ArchiveSession {
    /// Index `backend` and register the new session.
    ///
    /// Entries whose record cannot be read are skipped; one bad record does
    /// not make the rest of the archive unreachable.
    pub(crate) fn new(
        path: &Path,
        backend: Box<dyn ArchiveBackend>,
        registry: Arc<SessionRegistry>,
        staging: Arc<StagingArea>,
    ) -> Self {
        let entries = build_index(backend.as_ref(), path);
        let state = Arc::new(Mutex::new(SessionState {
            backend: Some(backend),
        }));
        let id = registry.register(state.clone());

        debug!(?id, path = %path.display(), entries = entries.len(), "opened archive");

        Self {
            id,
            path: path.to_path_buf(),
            entries,
            state,
            registry,
            staging,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).backend.is_some()
    }

    /// Release the archive and deregister the session.
    ///
    /// Safe to call any number of times; never fails.
    pub fn close(&self) {
        if lock(&self.state).release() {
            debug!(id = ?self.id, path = %self.path.display(), "closed archive");
        }
        self.registry.deregister(self.id);
    }

    /// All indexed entries, in archive order.
    pub fn list_entries(&self) -> Result<&[ArchiveEntry]> {
        self.ensure_open()?;
        Ok(&self.entries)
    }

    /// Whether a file entry with exactly this name exists.
    ///
    /// Directory entries never match. Always `false` once closed.
    pub fn entry_exists(&self, name: &str) -> bool {
        self.is_open() && self.file_entry(name).is_some()
    }

    /// Look up an entry of any kind by exact name.
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        if !self.is_open() {
            return None;
        }
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub(crate) fn file_entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries
            .iter()
            .find(|entry| !entry.is_directory && entry.name == name)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }
}

impl Drop for ArchiveSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ArchiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSession")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .field("open", &self.is_open())
            .finish()
    }
}

fn build_index(backend: &dyn ArchiveBackend, path: &Path) -> Vec<ArchiveEntry> {
    (0..backend.entry_count())
        .filter_map(|index| match backend.entry_info(index) {
            Ok(info) => Some(ArchiveEntry::from_info(index, info)),
            Err(err) => {
                warn!(path = %path.display(), index, error = %err, "skipping unreadable entry");
                None
            }
        })
        .collect()
}
