use std::io;
use std::path::PathBuf;

use crate::zip::FormatError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a zip archive: '{0}'")]
    NotAnArchive(PathBuf),

    #[error("failed to open archive '{path}': {source}")]
    OpenFailed { path: PathBuf, source: FormatError },

    #[error("archive session is closed")]
    SessionClosed,

    #[error("entry not found: '{0}'")]
    EntryNotFound(String),

    #[error("failed to open entry '{name}': {source}")]
    EntryOpenFailed { name: String, source: FormatError },

    #[error("failed to read entry '{name}': {source}")]
    EntryReadFailed { name: String, source: io::Error },

    #[error("entry '{name}' is truncated: expected {expected} bytes, read {actual}")]
    ReadTruncated {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("no payload found in archive '{0}'")]
    NoPayload(PathBuf),

    #[error("failed to write staged file '{path}': {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory: {path}: {source}")]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
