//! ZIP header records.
//!
//! Layouts follow PKWARE APPNOTE 6.3. All integers are little-endian.
//!
//! # Local file header (30 bytes + name + extra)
//!
//! ```text
//! sig(4) version_needed(2) flags(2) method(2) dos_time(2) dos_date(2)
//! crc32(4) compressed_size(4) uncompressed_size(4) name_len(2) extra_len(2)
//! ```
//!
//! # Central directory header (46 bytes + name + extra + comment)
//!
//! ```text
//! sig(4) made_by(2) version_needed(2) flags(2) method(2) dos_time(2) dos_date(2)
//! crc32(4) compressed_size(4) uncompressed_size(4) name_len(2) extra_len(2)
//! comment_len(2) disk_start(2) internal_attrs(2) external_attrs(4) local_offset(4)
//! ```
//!
//! # End of central directory (22 bytes + comment)
//!
//! ```text
//! sig(4) disk(2) cd_disk(2) entries_on_disk(2) total_entries(2)
//! cd_size(4) cd_offset(4) comment_len(2)
//! ```
//!
//! Values that overflow their classic field are saturated (`0xFFFF` /
//! `0xFFFFFFFF`) and carried in ZIP64 extra fields and end records instead.

use super::extra::{self, ExtraFields};
use super::FormatError;
use std::io::Read;

/// Local file header signature ("PK\x03\x04")
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// Central directory header signature ("PK\x01\x02")
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
/// End of central directory signature ("PK\x05\x06")
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
/// ZIP64 end of central directory signature ("PK\x06\x06")
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0606_4b50;
/// ZIP64 end of central directory locator signature ("PK\x06\x07")
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Fixed part of a local file header
pub const LOCAL_FILE_HEADER_SIZE: usize = 30;
/// Fixed part of a central directory header
pub const CENTRAL_DIRECTORY_HEADER_SIZE: usize = 46;
/// Fixed part of the end of central directory record
pub const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;
/// ZIP64 end of central directory record (without extensible data)
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE: usize = 56;
/// ZIP64 end of central directory locator
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// Saturated 16-bit field
pub const U16_SATURATED: u16 = u16::MAX;
/// Saturated 32-bit field
pub const U32_SATURATED: u32 = u32::MAX;

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: name and comment are UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// Version made by: Unix host, APPNOTE 6.3
pub const VERSION_MADE_BY: u16 = (3 << 8) | 63;
/// Version needed for ZIP64 records
pub const VERSION_ZIP64: u16 = 45;

/// Unix regular file, mode 0644, in the high half of the external attributes
pub const EXTERNAL_ATTRS_REGULAR_FILE: u32 = 0o100_644 << 16;

pub(crate) fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub(crate) fn u64_at(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Clamp a 64-bit value into a classic 32-bit field.
pub fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value)
        .ok()
        .filter(|v| *v != U32_SATURATED)
        .unwrap_or(U32_SATURATED)
}

/// Clamp an entry count into a classic 16-bit field.
pub fn saturate_u16(value: u64) -> u16 {
    u16::try_from(value)
        .ok()
        .filter(|v| *v != U16_SATURATED)
        .unwrap_or(U16_SATURATED)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), FormatError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FormatError::Truncated { what }
        } else {
            FormatError::Io(e)
        }
    })
}

fn read_vec<R: Read>(reader: &mut R, len: usize, what: &'static str) -> Result<Vec<u8>, FormatError> {
    let mut buf = vec![0u8; len];
    read_exact(reader, &mut buf, what)?;
    Ok(buf)
}

// =============================================================================
// Local file header
// =============================================================================

/// Local file header preceding each entry body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Version needed to extract
    pub version_needed: u16,
    /// General purpose flags
    pub flags: u16,
    /// Codec identifier
    pub method: u16,
    /// MS-DOS time
    pub dos_time: u16,
    /// MS-DOS date
    pub dos_date: u16,
    /// CRC-32 of the uncompressed body
    pub crc32: u32,
    /// Classic compressed size field (may be saturated)
    pub compressed_size: u32,
    /// Classic uncompressed size field (may be saturated)
    pub uncompressed_size: u32,
    /// Raw entry name
    pub name: Vec<u8>,
    /// Raw extra field block
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Total encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        LOCAL_FILE_HEADER_SIZE + self.name.len() + self.extra.len()
    }

    /// Serialize header to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&self.version_needed.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.method.to_le_bytes());
        buf.extend_from_slice(&self.dos_time.to_le_bytes());
        buf.extend_from_slice(&self.dos_date.to_le_bytes());
        buf.extend_from_slice(&self.crc32.to_le_bytes());
        buf.extend_from_slice(&self.compressed_size.to_le_bytes());
        buf.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.name);
        buf.extend_from_slice(&self.extra);
        buf
    }

    /// Read a header from the current reader position.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let mut fixed = [0u8; LOCAL_FILE_HEADER_SIZE];
        read_exact(reader, &mut fixed, "local file header")?;
        if u32_at(&fixed, 0) != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(FormatError::BadSignature {
                what: "local file header",
            });
        }
        let name_len = u16_at(&fixed, 26) as usize;
        let extra_len = u16_at(&fixed, 28) as usize;
        Ok(LocalFileHeader {
            version_needed: u16_at(&fixed, 4),
            flags: u16_at(&fixed, 6),
            method: u16_at(&fixed, 8),
            dos_time: u16_at(&fixed, 10),
            dos_date: u16_at(&fixed, 12),
            crc32: u32_at(&fixed, 14),
            compressed_size: u32_at(&fixed, 18),
            uncompressed_size: u32_at(&fixed, 22),
            name: read_vec(reader, name_len, "local file name")?,
            extra: read_vec(reader, extra_len, "local extra field")?,
        })
    }
}

/// Byte offset of the CRC field within a local file header.
pub const LOCAL_CRC_OFFSET: u64 = 14;

// =============================================================================
// Central directory header
// =============================================================================

/// Central directory record describing one entry.
///
/// Sizes and offset are held as resolved 64-bit values: on read the ZIP64
/// extra field has already been applied. A saturated classic field without a
/// matching ZIP64 value resolves to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    /// Version made by
    pub version_made_by: u16,
    /// Version needed to extract
    pub version_needed: u16,
    /// General purpose flags
    pub flags: u16,
    /// Codec identifier
    pub method: u16,
    /// MS-DOS time
    pub dos_time: u16,
    /// MS-DOS date
    pub dos_date: u16,
    /// CRC-32 of the uncompressed body
    pub crc32: u32,
    /// Compressed size
    pub compressed_size: Option<u64>,
    /// Uncompressed size
    pub uncompressed_size: Option<u64>,
    /// Disk number where the entry starts
    pub disk_start: u16,
    /// Internal file attributes
    pub internal_attrs: u16,
    /// External file attributes
    pub external_attrs: u32,
    /// Offset of the local file header
    pub local_header_offset: Option<u64>,
    /// Raw entry name
    pub name: Vec<u8>,
    /// Raw extra field block
    pub extra: Vec<u8>,
    /// Raw entry comment
    pub comment: Vec<u8>,
}

impl CentralDirectoryHeader {
    /// Build the record for a freshly written entry.
    ///
    /// The extra block gets an extended timestamp when `mtime` fits, and a
    /// ZIP64 field when any size or the offset overflows 32 bits.
    #[allow(clippy::too_many_arguments)]
    pub fn for_new_entry(
        name: &str,
        method: u16,
        version_needed: u16,
        (dos_time, dos_date): (u16, u16),
        mtime: Option<i64>,
        crc32: u32,
        compressed_size: u64,
        uncompressed_size: u64,
        local_header_offset: u64,
    ) -> Self {
        let mut extra_block = Vec::new();
        extra::push_zip64_central(
            &mut extra_block,
            uncompressed_size,
            compressed_size,
            local_header_offset,
        );
        if let Some(mtime) = mtime {
            extra::push_extended_timestamp(&mut extra_block, mtime);
        }
        let needs_zip64 = [uncompressed_size, compressed_size, local_header_offset]
            .iter()
            .any(|v| saturate_u32(*v) == U32_SATURATED);
        let version_needed = if needs_zip64 {
            version_needed.max(VERSION_ZIP64)
        } else {
            version_needed
        };

        CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            version_needed,
            flags: name_flags(name),
            method,
            dos_time,
            dos_date,
            crc32,
            compressed_size: Some(compressed_size),
            uncompressed_size: Some(uncompressed_size),
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: EXTERNAL_ATTRS_REGULAR_FILE,
            local_header_offset: Some(local_header_offset),
            name: name.as_bytes().to_vec(),
            extra: extra_block,
            comment: Vec::new(),
        }
    }

    /// Total encoded length of this record.
    pub fn encoded_len(&self) -> usize {
        CENTRAL_DIRECTORY_HEADER_SIZE + self.name.len() + self.extra.len() + self.comment.len()
    }

    /// Serialize record to bytes.
    ///
    /// Missing 64-bit values are written as saturated fields.
    pub fn to_bytes(&self) -> Vec<u8> {
        let sat = |v: Option<u64>| v.map(saturate_u32).unwrap_or(U32_SATURATED);
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&self.version_made_by.to_le_bytes());
        buf.extend_from_slice(&self.version_needed.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.method.to_le_bytes());
        buf.extend_from_slice(&self.dos_time.to_le_bytes());
        buf.extend_from_slice(&self.dos_date.to_le_bytes());
        buf.extend_from_slice(&self.crc32.to_le_bytes());
        buf.extend_from_slice(&sat(self.compressed_size).to_le_bytes());
        buf.extend_from_slice(&sat(self.uncompressed_size).to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.disk_start.to_le_bytes());
        buf.extend_from_slice(&self.internal_attrs.to_le_bytes());
        buf.extend_from_slice(&self.external_attrs.to_le_bytes());
        buf.extend_from_slice(&sat(self.local_header_offset).to_le_bytes());
        buf.extend_from_slice(&self.name);
        buf.extend_from_slice(&self.extra);
        buf.extend_from_slice(&self.comment);
        buf
    }

    /// Read one record from the current reader position.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let mut fixed = [0u8; CENTRAL_DIRECTORY_HEADER_SIZE];
        read_exact(reader, &mut fixed, "central directory header")?;
        if u32_at(&fixed, 0) != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(FormatError::BadSignature {
                what: "central directory header",
            });
        }
        let name_len = u16_at(&fixed, 28) as usize;
        let extra_len = u16_at(&fixed, 30) as usize;
        let comment_len = u16_at(&fixed, 32) as usize;
        let name = read_vec(reader, name_len, "central file name")?;
        let extra_block = read_vec(reader, extra_len, "central extra field")?;
        let comment = read_vec(reader, comment_len, "central file comment")?;

        let compressed32 = u32_at(&fixed, 20);
        let uncompressed32 = u32_at(&fixed, 24);
        let offset32 = u32_at(&fixed, 42);
        let disk16 = u16_at(&fixed, 34);

        // ZIP64 values appear only for saturated fields, in this fixed order
        let zip64 = ExtraFields::parse(&extra_block).zip64_central(
            uncompressed32 == U32_SATURATED,
            compressed32 == U32_SATURATED,
            offset32 == U32_SATURATED,
            disk16 == U16_SATURATED,
        );
        let resolve = |classic: u32, wide: Option<u64>| {
            if classic == U32_SATURATED {
                wide
            } else {
                Some(u64::from(classic))
            }
        };

        Ok(CentralDirectoryHeader {
            version_made_by: u16_at(&fixed, 4),
            version_needed: u16_at(&fixed, 6),
            flags: u16_at(&fixed, 8),
            method: u16_at(&fixed, 10),
            dos_time: u16_at(&fixed, 12),
            dos_date: u16_at(&fixed, 14),
            crc32: u32_at(&fixed, 16),
            compressed_size: resolve(compressed32, zip64.compressed_size),
            uncompressed_size: resolve(uncompressed32, zip64.uncompressed_size),
            disk_start: zip64
                .disk_start
                .map(|d| saturate_u16(u64::from(d)))
                .unwrap_or(disk16),
            internal_attrs: u16_at(&fixed, 36),
            external_attrs: u32_at(&fixed, 38),
            local_header_offset: resolve(offset32, zip64.local_header_offset),
            name,
            extra: extra_block,
            comment,
        })
    }

    /// Entry name, decoded as UTF-8 when flagged or valid, lossily otherwise.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Whether the entry body is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

/// Flags for an entry name: UTF-8 bit only when the name is not plain ASCII.
pub fn name_flags(name: &str) -> u16 {
    if name.is_ascii() {
        0
    } else {
        FLAG_UTF8
    }
}

// =============================================================================
// End records
// =============================================================================

/// Classic end of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk
    pub disk_number: u16,
    /// Disk where the central directory starts
    pub cd_disk: u16,
    /// Entries on this disk
    pub entries_on_disk: u16,
    /// Total entries
    pub total_entries: u16,
    /// Central directory size
    pub cd_size: u32,
    /// Central directory offset
    pub cd_offset: u32,
    /// Container comment
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Build a single-disk record, saturating overflowing fields.
    pub fn new(entry_count: u64, cd_size: u64, cd_offset: u64, comment: Vec<u8>) -> Self {
        let entries = saturate_u16(entry_count);
        EndOfCentralDirectory {
            disk_number: 0,
            cd_disk: 0,
            entries_on_disk: entries,
            total_entries: entries,
            cd_size: saturate_u32(cd_size),
            cd_offset: saturate_u32(cd_offset),
            comment,
        }
    }

    /// Whether any field is saturated, meaning ZIP64 records must exist.
    pub fn needs_zip64(&self) -> bool {
        self.entries_on_disk == U16_SATURATED
            || self.total_entries == U16_SATURATED
            || self.cd_size == U32_SATURATED
            || self.cd_offset == U32_SATURATED
    }

    /// Serialize record to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(END_OF_CENTRAL_DIRECTORY_SIZE + self.comment.len());
        buf.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&self.disk_number.to_le_bytes());
        buf.extend_from_slice(&self.cd_disk.to_le_bytes());
        buf.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        buf.extend_from_slice(&self.total_entries.to_le_bytes());
        buf.extend_from_slice(&self.cd_size.to_le_bytes());
        buf.extend_from_slice(&self.cd_offset.to_le_bytes());
        buf.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.comment);
        buf
    }

    /// Parse a record from a buffer starting at its signature.
    ///
    /// The comment is clipped to the bytes available.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < END_OF_CENTRAL_DIRECTORY_SIZE {
            return Err(FormatError::Truncated {
                what: "end of central directory",
            });
        }
        if u32_at(bytes, 0) != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(FormatError::BadSignature {
                what: "end of central directory",
            });
        }
        let comment_len = u16_at(bytes, 20) as usize;
        let comment_end = (END_OF_CENTRAL_DIRECTORY_SIZE + comment_len).min(bytes.len());
        Ok(EndOfCentralDirectory {
            disk_number: u16_at(bytes, 4),
            cd_disk: u16_at(bytes, 6),
            entries_on_disk: u16_at(bytes, 8),
            total_entries: u16_at(bytes, 10),
            cd_size: u32_at(bytes, 12),
            cd_offset: u32_at(bytes, 16),
            comment: bytes[END_OF_CENTRAL_DIRECTORY_SIZE..comment_end].to_vec(),
        })
    }
}

/// ZIP64 end of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EndOfCentralDirectory {
    /// Version made by
    pub version_made_by: u16,
    /// Version needed to extract
    pub version_needed: u16,
    /// Number of this disk
    pub disk_number: u32,
    /// Disk where the central directory starts
    pub cd_disk: u32,
    /// Entries on this disk
    pub entries_on_disk: u64,
    /// Total entries
    pub total_entries: u64,
    /// Central directory size
    pub cd_size: u64,
    /// Central directory offset
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    /// Build a single-disk record.
    pub fn new(entry_count: u64, cd_size: u64, cd_offset: u64) -> Self {
        Zip64EndOfCentralDirectory {
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_ZIP64,
            disk_number: 0,
            cd_disk: 0,
            entries_on_disk: entry_count,
            total_entries: entry_count,
            cd_size,
            cd_offset,
        }
    }

    /// Serialize record to bytes.
    pub fn to_bytes(&self) -> [u8; ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE] {
        let mut bytes = [0u8; ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE];
        bytes[0..4].copy_from_slice(&ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        // Size of the remaining record, excluding the leading 12 bytes
        let remaining = (ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE - 12) as u64;
        bytes[4..12].copy_from_slice(&remaining.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.version_made_by.to_le_bytes());
        bytes[14..16].copy_from_slice(&self.version_needed.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.disk_number.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.cd_disk.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.entries_on_disk.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.total_entries.to_le_bytes());
        bytes[40..48].copy_from_slice(&self.cd_size.to_le_bytes());
        bytes[48..56].copy_from_slice(&self.cd_offset.to_le_bytes());
        bytes
    }

    /// Parse the fixed part of the record; extensible data is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE {
            return Err(FormatError::Truncated {
                what: "zip64 end of central directory",
            });
        }
        if u32_at(bytes, 0) != ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(FormatError::BadSignature {
                what: "zip64 end of central directory",
            });
        }
        Ok(Zip64EndOfCentralDirectory {
            version_made_by: u16_at(bytes, 12),
            version_needed: u16_at(bytes, 14),
            disk_number: u32_at(bytes, 16),
            cd_disk: u32_at(bytes, 20),
            entries_on_disk: u64_at(bytes, 24),
            total_entries: u64_at(bytes, 32),
            cd_size: u64_at(bytes, 40),
            cd_offset: u64_at(bytes, 48),
        })
    }
}

/// ZIP64 end of central directory locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Locator {
    /// Disk holding the ZIP64 end record
    pub eocd64_disk: u32,
    /// Offset of the ZIP64 end record
    pub eocd64_offset: u64,
    /// Total number of disks
    pub total_disks: u32,
}

impl Zip64Locator {
    /// Locator for a single-disk container.
    pub fn new(eocd64_offset: u64) -> Self {
        Zip64Locator {
            eocd64_disk: 0,
            eocd64_offset,
            total_disks: 1,
        }
    }

    /// Serialize locator to bytes.
    pub fn to_bytes(&self) -> [u8; ZIP64_LOCATOR_SIZE] {
        let mut bytes = [0u8; ZIP64_LOCATOR_SIZE];
        bytes[0..4].copy_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.eocd64_disk.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.eocd64_offset.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.total_disks.to_le_bytes());
        bytes
    }

    /// Parse a locator; `None` when the signature does not match.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ZIP64_LOCATOR_SIZE || u32_at(bytes, 0) != ZIP64_LOCATOR_SIGNATURE {
            return None;
        }
        Some(Zip64Locator {
            eocd64_disk: u32_at(bytes, 4),
            eocd64_offset: u64_at(bytes, 8),
            total_disks: u32_at(bytes, 16),
        })
    }
}
