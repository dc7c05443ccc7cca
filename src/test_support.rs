//! In-memory [`ArchiveBackend`] for unit tests.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::zip::{ArchiveBackend, EntryInfo, EntryStream, FormatError};

struct FakeEntry {
    name: String,
    declared_size: u64,
    data: Vec<u8>,
    broken: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    entries: Vec<FakeEntry>,
    releases: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.truncated(name, data.len() as u64, data)
    }

    pub fn dir(self, name: &str) -> Self {
        self.file(name, b"")
    }

    /// Entry whose header claims `declared_size` bytes but streams `data`.
    pub fn truncated(mut self, name: &str, declared_size: u64, data: &[u8]) -> Self {
        self.entries.push(FakeEntry {
            name: name.to_string(),
            declared_size,
            data: data.to_vec(),
            broken: false,
        });
        self
    }

    /// Entry whose record cannot be read.
    pub fn broken(mut self, name: &str) -> Self {
        self.entries.push(FakeEntry {
            name: name.to_string(),
            declared_size: 0,
            data: Vec::new(),
            broken: true,
        });
        self
    }

    /// Counts how many times the backend has been dropped.
    pub fn releases(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }

    fn get(&self, index: usize) -> Result<&FakeEntry, FormatError> {
        match self.entries.get(index) {
            Some(entry) if !entry.broken => Ok(entry),
            _ => Err(FormatError::Malformed("corrupt record")),
        }
    }
}

impl ArchiveBackend for FakeBackend {
    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_info(&self, index: usize) -> Result<EntryInfo, FormatError> {
        let entry = self.get(index)?;
        Ok(EntryInfo {
            name: entry.name.clone(),
            compressed_size: entry.data.len() as u64,
            uncompressed_size: entry.declared_size,
        })
    }

    fn open_entry(&mut self, index: usize) -> Result<EntryStream<'_>, FormatError> {
        let entry = self.get(index)?;
        Ok(Box::new(Cursor::new(entry.data.as_slice())))
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
