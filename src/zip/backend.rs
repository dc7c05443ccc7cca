//! The archive capability consumed by sessions.
//!
//! [`ArchiveBackend`] is the seam between the session layer and whatever
//! actually understands the container. [`ZipBackend`] is the implementation
//! built on [`ZipParser`].

use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use flate2::read::DeflateDecoder;

use crate::io::{LocalFileReader, ReadAt};

use super::FormatError;
use super::parser::{CentralDirectory, ZipParser};
use super::structures::{CompressionMethod, ZipFileEntry};

/// Metadata for one entry as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Decompressed byte stream of the entry currently open for reading.
///
/// The stream mutably borrows its backend, so at most one entry is open per
/// archive at a time. Dropping the stream closes the entry.
pub type EntryStream<'a> = Box<dyn Read + 'a>;

/// An open archive.
///
/// Entries are addressed by their position in archive order. Dropping the
/// backend releases the underlying archive.
pub trait ArchiveBackend: Send {
    /// Number of entry records that could be located.
    fn entry_count(&self) -> usize;

    /// Read the metadata of the entry at `index`.
    fn entry_info(&self, index: usize) -> Result<EntryInfo, FormatError>;

    /// Position on the entry at `index` and open it for streaming reads.
    fn open_entry(&mut self, index: usize) -> Result<EntryStream<'_>, FormatError>;
}

/// [`ArchiveBackend`] over a ZIP archive.
pub struct ZipBackend<R: ReadAt> {
    parser: ZipParser<R>,
    directory: CentralDirectory,
    records: Vec<Range<usize>>,
}

impl ZipBackend<LocalFileReader> {
    /// Open a ZIP archive on the local filesystem.
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let reader = LocalFileReader::new(path)?;
        Self::new(Arc::new(reader))
    }
}

impl<R: ReadAt> ZipBackend<R> {
    /// Read the end records and central directory of the archive behind `reader`.
    pub fn new(reader: Arc<R>) -> Result<Self, FormatError> {
        let parser = ZipParser::new(reader);
        let directory = parser.read_central_directory()?;
        let records = parser.split_records(&directory);
        Ok(Self {
            parser,
            directory,
            records,
        })
    }

    fn record(&self, index: usize) -> Result<ZipFileEntry, FormatError> {
        let range = self
            .records
            .get(index)
            .cloned()
            .ok_or(FormatError::Malformed("entry index out of range"))?;
        self.parser
            .parse_cdfh(&self.directory.data[range], self.directory.offset)
    }
}

impl<R: ReadAt + 'static> ArchiveBackend for ZipBackend<R> {
    fn entry_count(&self) -> usize {
        self.records.len()
    }

    fn entry_info(&self, index: usize) -> Result<EntryInfo, FormatError> {
        let entry = self.record(index)?;
        Ok(EntryInfo {
            name: entry.file_name,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
        })
    }

    fn open_entry(&mut self, index: usize) -> Result<EntryStream<'_>, FormatError> {
        let entry = self.record(index)?;
        let data_offset = self.parser.get_data_offset(&entry)?;

        match data_offset.checked_add(entry.compressed_size) {
            Some(end) if end <= self.parser.size() => {}
            _ => return Err(FormatError::Malformed("entry data extends past end of archive")),
        }

        let section = SectionReader {
            reader: self.parser.reader().as_ref(),
            offset: data_offset,
            remaining: entry.compressed_size,
        };

        match entry.compression_method {
            CompressionMethod::Stored => Ok(Box::new(section)),
            CompressionMethod::Deflate => Ok(Box::new(DeflateDecoder::new(section))),
            CompressionMethod::Unknown(method) => Err(FormatError::UnsupportedCompression(method)),
        }
    }
}

/// Sequential reads over a bounded region of a [`ReadAt`] source.
struct SectionReader<'a, R: ReadAt> {
    reader: &'a R,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> Read for SectionReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.reader.read_at(self.offset, &mut buf[..want])?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
