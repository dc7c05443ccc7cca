//! ZIP archive parsing and entry streaming.
//!
//! This module is the archive capability used by sessions: it knows how to
//! find entries in a ZIP file and how to stream their decompressed bytes.
//! Nothing above it touches the ZIP format directly.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`backend`]: The [`ArchiveBackend`] trait and its ZIP implementation
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file), then the Central
//! Directory, so listing never touches entry data.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod backend;
mod parser;
mod structures;

pub use backend::{ArchiveBackend, EntryInfo, EntryStream, ZipBackend};
pub use parser::{CentralDirectory, ZipParser};
pub use structures::*;

/// Problems with the structure of an archive.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{0}")]
    Malformed(&'static str),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
