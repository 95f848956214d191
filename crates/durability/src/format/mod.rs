//! On-disk container format.
//!
//! The container is a standard ZIP file (PKWARE APPNOTE 6.3) so that any
//! unzip tool can restore segments from it.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Local header 0 │ body 0      │
//! ├──────────────────────────────┤
//! │ Local header 1 │ body 1      │
//! ├──────────────────────────────┤
//! │ ...                          │
//! ├──────────────────────────────┤
//! │ Central directory (1 / entry)│
//! ├──────────────────────────────┤
//! │ ZIP64 end record + locator   │  (only when a classic field overflows)
//! ├──────────────────────────────┤
//! │ End of central directory     │
//! │ + container comment          │
//! └──────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - `records`: header and end record layouts
//! - `extra`: extra field blocks (ZIP64, extended timestamp, AES)
//! - `dostime`: MS-DOS date/time words

pub mod dostime;
pub mod extra;
pub mod records;

pub use extra::{AesExtra, ExtraFields};
pub use records::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader, Zip64EndOfCentralDirectory,
    Zip64Locator, END_OF_CENTRAL_DIRECTORY_SIZE, FLAG_ENCRYPTED, FLAG_UTF8,
    LOCAL_FILE_HEADER_SIZE, ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE, ZIP64_LOCATOR_SIZE,
};

use records::{u32_at, END_OF_CENTRAL_DIRECTORY_SIGNATURE};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Longest tail that can hold the end record plus a maximal comment.
const MAX_END_SEARCH: u64 = (END_OF_CENTRAL_DIRECTORY_SIZE + u16::MAX as usize) as u64;

/// Container format errors.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Record ends before its declared length
    #[error("{what} is truncated")]
    Truncated {
        /// Record being read
        what: &'static str,
    },

    /// Record does not start with its signature
    #[error("bad {what} signature")]
    BadSignature {
        /// Record being read
        what: &'static str,
    },

    /// No end of central directory record in the file tail
    #[error("end of central directory record not found")]
    MissingEndOfDirectory,

    /// Records disagree with each other or with the file size
    #[error("{0}")]
    Inconsistent(String),

    /// Container spans several disks
    #[error("multi-disk containers are not supported")]
    MultiDisk,

    /// I/O failure while reading
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Central directory location, resolved from the end records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDirectory {
    /// Number of entries
    pub entry_count: u64,
    /// Offset of the first central directory record
    pub cd_offset: u64,
    /// Total size of the central directory
    pub cd_size: u64,
    /// Container comment
    pub comment: Vec<u8>,
}

impl ContainerDirectory {
    /// Directory of a container with no entries.
    pub fn empty() -> Self {
        ContainerDirectory::default()
    }
}

/// Locate the central directory of a container of `file_len` bytes.
pub fn locate_directory<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
) -> Result<ContainerDirectory, FormatError> {
    if file_len < END_OF_CENTRAL_DIRECTORY_SIZE as u64 {
        return Err(FormatError::Truncated {
            what: "container",
        });
    }

    let tail_len = file_len.min(MAX_END_SEARCH);
    let tail_start = file_len - tail_len;
    reader.seek(SeekFrom::Start(tail_start))?;
    let mut tail = vec![0u8; tail_len as usize];
    reader.read_exact(&mut tail)?;

    // Scan backwards; the record must end exactly where its comment says. A
    // comment may itself contain signature bytes, so the first candidate
    // whose records hold together wins.
    let mut first_error = None;
    for pos in (0..=tail.len() - END_OF_CENTRAL_DIRECTORY_SIZE).rev() {
        let candidate = u32_at(&tail, pos) == END_OF_CENTRAL_DIRECTORY_SIGNATURE
            && pos + END_OF_CENTRAL_DIRECTORY_SIZE + records::u16_at(&tail, pos + 20) as usize
                == tail.len();
        if !candidate {
            continue;
        }
        match resolve_end_records(reader, &tail[pos..], tail_start + pos as u64) {
            Ok(directory) => return Ok(directory),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(FormatError::MissingEndOfDirectory))
}

fn resolve_end_records<R: Read + Seek>(
    reader: &mut R,
    eocd_bytes: &[u8],
    eocd_offset: u64,
) -> Result<ContainerDirectory, FormatError> {
    let eocd = EndOfCentralDirectory::from_bytes(eocd_bytes)?;

    if eocd.disk_number != 0 || eocd.cd_disk != 0 || eocd.entries_on_disk != eocd.total_entries {
        return Err(FormatError::MultiDisk);
    }

    let locator = eocd_offset
        .checked_sub(ZIP64_LOCATOR_SIZE as u64)
        .map(|at| read_at(reader, at, ZIP64_LOCATOR_SIZE))
        .transpose()?
        .and_then(|bytes| Zip64Locator::from_bytes(&bytes));

    let (directory, end_start) = match locator {
        Some(locator) => {
            if locator.eocd64_disk != 0 || locator.total_disks > 1 {
                return Err(FormatError::MultiDisk);
            }
            let eocd64_end = locator
                .eocd64_offset
                .saturating_add(ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE as u64);
            if eocd64_end > eocd_offset - ZIP64_LOCATOR_SIZE as u64 {
                return Err(FormatError::Inconsistent(
                    "zip64 end record overlaps its locator".to_string(),
                ));
            }
            let bytes = read_at(
                reader,
                locator.eocd64_offset,
                ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE,
            )?;
            let eocd64 = Zip64EndOfCentralDirectory::from_bytes(&bytes)?;
            if eocd64.disk_number != 0 || eocd64.cd_disk != 0 {
                return Err(FormatError::MultiDisk);
            }
            (
                ContainerDirectory {
                    entry_count: eocd64.total_entries,
                    cd_offset: eocd64.cd_offset,
                    cd_size: eocd64.cd_size,
                    comment: eocd.comment,
                },
                locator.eocd64_offset,
            )
        }
        None if eocd.needs_zip64() => {
            return Err(FormatError::Inconsistent(
                "saturated end record without zip64 locator".to_string(),
            ));
        }
        None => (
            ContainerDirectory {
                entry_count: u64::from(eocd.total_entries),
                cd_offset: u64::from(eocd.cd_offset),
                cd_size: u64::from(eocd.cd_size),
                comment: eocd.comment,
            },
            eocd_offset,
        ),
    };

    let cd_end = directory
        .cd_offset
        .checked_add(directory.cd_size)
        .ok_or_else(|| FormatError::Inconsistent("central directory size overflows".to_string()))?;
    if cd_end > end_start {
        return Err(FormatError::Inconsistent(format!(
            "central directory [{}, {}) runs past end records at {}",
            directory.cd_offset, cd_end, end_start
        )));
    }
    let min_cd_size = directory
        .entry_count
        .saturating_mul(records::CENTRAL_DIRECTORY_HEADER_SIZE as u64);
    if directory.cd_size < min_cd_size {
        return Err(FormatError::Inconsistent(format!(
            "central directory of {} bytes cannot hold {} entries",
            directory.cd_size, directory.entry_count
        )));
    }

    Ok(directory)
}

fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> Result<Vec<u8>, FormatError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated { what: "end record" }
        } else {
            FormatError::Io(e)
        }
    })?;
    Ok(buf)
}

/// Write end records for a central directory ending at `cd_offset + cd_size`.
///
/// ZIP64 records are emitted only when a classic field would saturate.
/// Returns the number of bytes written.
pub fn write_end_records<W: Write>(
    writer: &mut W,
    entry_count: u64,
    cd_offset: u64,
    cd_size: u64,
    comment: &[u8],
) -> io::Result<u64> {
    let eocd = EndOfCentralDirectory::new(entry_count, cd_size, cd_offset, comment.to_vec());
    let mut written = 0u64;
    if eocd.needs_zip64() {
        let eocd64 = Zip64EndOfCentralDirectory::new(entry_count, cd_size, cd_offset);
        writer.write_all(&eocd64.to_bytes())?;
        writer.write_all(&Zip64Locator::new(cd_offset + cd_size).to_bytes())?;
        written += (ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE + ZIP64_LOCATOR_SIZE) as u64;
    }
    let bytes = eocd.to_bytes();
    writer.write_all(&bytes)?;
    written += bytes.len() as u64;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn container_with_end(entry_count: u64, cd: &[u8], comment: &[u8]) -> Vec<u8> {
        let mut buf = vec![0xAAu8; 64]; // stand-in entry region
        let cd_offset = buf.len() as u64;
        buf.extend_from_slice(cd);
        write_end_records(&mut buf, entry_count, cd_offset, cd.len() as u64, comment).unwrap();
        buf
    }

    fn fake_cd(entries: usize) -> Vec<u8> {
        vec![0u8; entries * records::CENTRAL_DIRECTORY_HEADER_SIZE]
    }

    #[test]
    fn test_locate_empty_container() {
        let mut buf = Vec::new();
        write_end_records(&mut buf, 0, 0, 0, b"").unwrap();
        assert_eq!(buf.len(), END_OF_CENTRAL_DIRECTORY_SIZE);

        let dir = locate_directory(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(dir, ContainerDirectory::empty());
    }

    #[test]
    fn test_locate_with_comment() {
        let buf = container_with_end(2, &fake_cd(2), b"WAL archive for main cluster");
        let dir = locate_directory(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(dir.entry_count, 2);
        assert_eq!(dir.cd_offset, 64);
        assert_eq!(dir.cd_size, 92);
        assert_eq!(dir.comment, b"WAL archive for main cluster");
    }

    #[test]
    fn test_comment_containing_signature_bytes() {
        // A comment that itself looks like an end record must not confuse the scan
        let mut fake = Vec::new();
        write_end_records(&mut fake, 9, 1, 1, b"").unwrap();
        let buf = container_with_end(1, &fake_cd(1), &fake);
        let dir = locate_directory(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(dir.entry_count, 1);
        assert_eq!(dir.comment, fake);
    }

    #[test]
    fn test_zip64_end_records_for_many_entries() {
        let cd = fake_cd(70_000);
        let buf = container_with_end(70_000, &cd, b"big");
        let dir = locate_directory(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(dir.entry_count, 70_000);
        assert_eq!(dir.cd_size, cd.len() as u64);
        assert_eq!(dir.comment, b"big");
    }

    #[test]
    fn test_too_small() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            locate_directory(&mut Cursor::new(&buf), 10),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_missing_end_record() {
        let buf = vec![0u8; 4096];
        assert!(matches!(
            locate_directory(&mut Cursor::new(&buf), 4096),
            Err(FormatError::MissingEndOfDirectory)
        ));
    }

    #[test]
    fn test_directory_past_end_is_inconsistent() {
        let mut buf = vec![0u8; 16];
        // claims a 1000 byte directory at offset 0
        write_end_records(&mut buf, 1, 0, 1000, b"").unwrap();
        assert!(matches!(
            locate_directory(&mut Cursor::new(&buf), buf.len() as u64),
            Err(FormatError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_entry_count_larger_than_directory() {
        let buf = container_with_end(5, &fake_cd(1), b"");
        assert!(matches!(
            locate_directory(&mut Cursor::new(&buf), buf.len() as u64),
            Err(FormatError::Inconsistent(_))
        ));
    }
}
