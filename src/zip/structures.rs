use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::FormatError;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    /// Longest archive comment that can follow the record.
    pub const MAX_COMMENT_SIZE: u64 = 65535;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::Malformed("invalid end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::Malformed("invalid zip64 locator"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::Malformed("invalid zip64 end of central directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Parsed central directory record
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
}

/// Header value meaning "the real value is in the ZIP64 extra field".
pub const ZIP64_MARKER: u64 = 0xFFFFFFFF;

/// Extra field ID of the ZIP64 extended information block.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// The 64-bit-capable fields of a central directory record.
///
/// Starts out with the 32-bit header values and is completed from the
/// ZIP64 extra field, which only carries the fields marked 0xFFFFFFFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSizes {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub lfh_offset: u64,
}

impl RecordSizes {
    /// Walk a record's extra field block and fill in ZIP64 values.
    ///
    /// # Errors
    ///
    /// Fails if a marked field has no replacement in the block.
    pub fn resolve_zip64(mut self, extra: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(extra);
        let end = extra.len() as u64;

        while cursor.position() + 4 <= end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;
            let field_end = (cursor.position() + field_size as u64).min(end);

            if header_id == ZIP64_EXTRA_ID {
                // Fields appear in this order, each only if marked
                for value in [
                    &mut self.uncompressed_size,
                    &mut self.compressed_size,
                    &mut self.lfh_offset,
                ] {
                    if *value == ZIP64_MARKER && cursor.position() + 8 <= field_end {
                        *value = cursor.read_u64::<LittleEndian>()?;
                    }
                }
            }

            cursor.set_position(field_end);
        }

        if self.uncompressed_size == ZIP64_MARKER
            || self.compressed_size == ZIP64_MARKER
            || self.lfh_offset == ZIP64_MARKER
        {
            return Err(FormatError::Malformed("zip64 sizes missing from extra field"));
        }

        Ok(self)
    }
}
