//! Entry extraction into memory or into a staged file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::paths::sanitize_file_name;
use crate::session::ArchiveSession;

/// Process-wide staged file counter. Never reset.
static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Most bytes reserved up front for an entry. Declared sizes come from the
/// archive and are not trusted; larger entries grow the buffer as they read.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Directory that staged entries are written into.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` to a fresh `temp_<n>_<base name>` file.
    ///
    /// The file belongs to the caller; nothing here deletes it later.
    pub fn stage(&self, entry_name: &str, data: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::DirectoryCreateFailed {
            path: self.dir.clone(),
            source,
        })?;

        let n = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self
            .dir
            .join(format!("temp_{}_{}", n, sanitize_file_name(entry_name)));

        write_staged(&path, data)?;

        debug!(entry = entry_name, path = %path.display(), bytes = data.len(), "staged entry");
        Ok(path)
    }
}

/// Create `path` and fill it with `data`.
fn write_staged(path: &Path, data: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    write_or_discard(path, file, data)
}

/// Write `data` through `file`, removing `path` again if any write fails.
fn write_or_discard(path: &Path, mut file: impl Write, data: &[u8]) -> Result<()> {
    if let Err(source) = file.write_all(data).and_then(|()| file.flush()) {
        drop(file);
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "failed to remove partial staged file");
        }
        return Err(Error::WriteFailed {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

impl ArchiveSession {
    /// Decompress a file entry into an owned buffer.
    ///
    /// The buffer holds exactly the entry's declared uncompressed size;
    /// a shorter stream fails with [`Error::ReadTruncated`].
    pub fn extract_to_memory(&self, name: &str) -> Result<Vec<u8>> {
        let mut state = self.state();
        let backend = state.backend()?;

        let entry = self
            .file_entry(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        let expected = entry.uncompressed_size;

        let stream = backend
            .open_entry(entry.index)
            .map_err(|source| Error::EntryOpenFailed {
                name: name.to_string(),
                source,
            })?;

        let reserve = expected.min(MAX_PREALLOC) as usize;
        let mut data = Vec::with_capacity(reserve);
        stream
            .take(expected)
            .read_to_end(&mut data)
            .map_err(|source| Error::EntryReadFailed {
                name: name.to_string(),
                source,
            })?;

        let actual = data.len() as u64;
        if actual != expected {
            warn!(entry = name, expected, actual, "entry shorter than declared");
            return Err(Error::ReadTruncated {
                name: name.to_string(),
                expected,
                actual,
            });
        }

        Ok(data)
    }

    /// Extract a file entry and write it into the staging directory.
    ///
    /// Returns the path of the staged file.
    pub fn extract_to_temp_file(&self, name: &str) -> Result<PathBuf> {
        let data = self.extract_to_memory(name)?;
        self.staging.stage(name, &data)
    }
}
