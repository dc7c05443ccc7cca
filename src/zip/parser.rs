//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory and split it into per-entry records
//! 4. Parse each record on demand; for extraction, read the entry's
//!    Local File Header to find where its data starts
//!
//! Splitting and parsing are separate steps so that a single record with
//! bad contents can be reported on its own without losing its neighbours.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::ops::Range;
use std::sync::Arc;

use tracing::warn;

use crate::io::ReadAt;

use super::FormatError;
use super::structures::*;

/// Raw central directory bytes plus where they were found.
pub struct CentralDirectory {
    /// Offset of the central directory in the archive
    pub offset: u64,
    /// Number of entries the end record claims
    pub total_entries: u64,
    /// The central directory itself
    pub data: Vec<u8>,
}

/// Low-level ZIP file parser.
///
/// Generic over the reader type so archives can be read from a file on
/// disk or from memory. Typically used through
/// [`ZipBackend`](super::ZipBackend) rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// Returns an error if no valid EOCD can be found, indicating
    /// the file is not a valid ZIP archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), FormatError> {
        // Common case first: no archive comment.
        if self.size >= EndOfCentralDirectory::SIZE as u64 {
            let offset = self.size - EndOfCentralDirectory::SIZE as u64;
            let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
            self.reader.read_exact_at(offset, &mut buf)?;

            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
                return Ok((eocd, offset));
            }
        }

        // The EOCD sits before a comment of up to 64 KiB; search backwards.
        let search_size = (EndOfCentralDirectory::MAX_COMMENT_SIZE
            + EndOfCentralDirectory::SIZE as u64)
            .min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // Only accept a candidate whose comment length reaches exactly to EOF.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(FormatError::Malformed("not a valid zip file"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD, FormatError> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(FormatError::Malformed("missing zip64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read the whole Central Directory into memory.
    ///
    /// # Errors
    ///
    /// Fails if the end records are missing or point outside the archive.
    pub fn read_central_directory(&self) -> Result<CentralDirectory, FormatError> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        // Refuse to allocate for a directory that cannot fit in the file
        match cd_offset.checked_add(cd_size) {
            Some(end) if end <= self.size => {}
            _ => return Err(FormatError::Malformed("central directory out of bounds")),
        }

        let mut data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut data)?;

        Ok(CentralDirectory {
            offset: cd_offset,
            total_entries,
            data,
        })
    }

    /// Split the Central Directory into one byte range per record.
    ///
    /// Only the fixed header and its three length fields are trusted here.
    /// A record with a bad signature or one that runs past the end of the
    /// directory ends the walk: records after it cannot be located.
    pub fn split_records(&self, cd: &CentralDirectory) -> Vec<Range<usize>> {
        let data = &cd.data;
        let mut records = Vec::new();
        let mut pos = 0usize;

        while (records.len() as u64) < cd.total_entries {
            if pos + CDFH_MIN_SIZE > data.len() || &data[pos..pos + 4] != CDFH_SIGNATURE {
                warn!(
                    record = records.len(),
                    expected = cd.total_entries,
                    "central directory ends early, ignoring remaining records"
                );
                break;
            }

            let name_len = u16::from_le_bytes([data[pos + 28], data[pos + 29]]) as usize;
            let extra_len = u16::from_le_bytes([data[pos + 30], data[pos + 31]]) as usize;
            let comment_len = u16::from_le_bytes([data[pos + 32], data[pos + 33]]) as usize;
            let end = pos + CDFH_MIN_SIZE + name_len + extra_len + comment_len;

            if end > data.len() {
                warn!(
                    record = records.len(),
                    "central directory record truncated, ignoring remaining records"
                );
                break;
            }

            records.push(pos..end);
            pos = end;
        }

        records
    }

    /// Parse a single Central Directory File Header.
    ///
    /// `cd_offset` bounds where the entry's local header and data may live.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid or points outside the
    /// archive data area.
    pub fn parse_cdfh(&self, record: &[u8], cd_offset: u64) -> Result<ZipFileEntry, FormatError> {
        let mut cursor = Cursor::new(record);

        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(FormatError::Malformed("invalid central directory file header"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let _crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let _file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Lossy so non-UTF8 names are still listed
        let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();
        if file_name.is_empty() {
            return Err(FormatError::Malformed("entry has an empty name"));
        }

        let extra_start = cursor.position() as usize;
        let extra = record
            .get(extra_start..extra_start + extra_field_length as usize)
            .ok_or(FormatError::Malformed("extra field runs past record"))?;
        let sizes = RecordSizes {
            uncompressed_size,
            compressed_size,
            lfh_offset,
        }
        .resolve_zip64(extra)?;

        // Local header and data must precede the central directory
        let data_end = sizes
            .lfh_offset
            .checked_add(LFH_SIZE as u64)
            .and_then(|end| end.checked_add(sizes.compressed_size));
        match data_end {
            Some(end) if end <= cd_offset => {}
            _ => return Err(FormatError::Malformed("entry data outside archive")),
        }

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size: sizes.compressed_size,
            uncompressed_size: sizes.uncompressed_size,
            lfh_offset: sizes.lfh_offset,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This method reads the LFH to calculate where the actual file
    /// data begins.
    ///
    /// # Errors
    ///
    /// Returns an error if the LFH is invalid.
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64, FormatError> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(FormatError::Malformed("invalid local file header"));
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}
