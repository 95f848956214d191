//! Container query and result types

use crate::format::{dostime, CentralDirectoryHeader, ExtraFields};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::PathBuf;
use walzip_core::CompressionMethod;

/// Codec id marking a WinZip AES entry; the real codec is in the AES field
pub const AES_METHOD: u16 = 99;

/// Encryption method codes reported for entries
pub mod encryption {
    /// Not encrypted
    pub const NONE: u16 = 0;
    /// Traditional PKWARE encryption
    pub const TRADITIONAL_PKWARE: u16 = 1;
    /// WinZip AES; add the key strength (1 = 128, 2 = 192, 3 = 256 bit)
    pub const AES_BASE: u16 = 0x0100;
}

/// Metadata for one entry.
///
/// Every field is optional: a value the container cannot vouch for is
/// `None`, never a made-up default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStat {
    /// Position in the container, 0-based
    pub index: Option<u64>,
    /// Logical file name
    pub name: Option<String>,
    /// Original size
    pub uncompressed_size: Option<u64>,
    /// Stored size
    pub compressed_size: Option<u64>,
    /// Modification time of the archived file
    pub modification_time: Option<DateTime<Utc>>,
    /// CRC-32 of the original bytes
    pub checksum: Option<u32>,
    /// Codec, when it maps to a known method
    pub compression_method: Option<CompressionMethod>,
    /// Encryption method code (see [`encryption`])
    pub encryption_method: Option<u16>,
}

impl EntryStat {
    /// Describe the entry held by a central directory record.
    pub fn from_central(index: u64, header: &CentralDirectoryHeader) -> Self {
        let extra = ExtraFields::parse(&header.extra);

        let modification_time = extra
            .mtime
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| dostime::from_dos(header.dos_time, header.dos_date));

        let (compression_method, encryption_method) = if header.method == AES_METHOD {
            match extra.aes {
                Some(aes) => (
                    CompressionMethod::from_codec_id(aes.actual_method),
                    Some(encryption::AES_BASE + u16::from(aes.strength)),
                ),
                None => (None, None),
            }
        } else if header.is_encrypted() {
            (
                CompressionMethod::from_codec_id(header.method),
                Some(encryption::TRADITIONAL_PKWARE),
            )
        } else {
            (
                CompressionMethod::from_codec_id(header.method),
                Some(encryption::NONE),
            )
        };

        EntryStat {
            index: Some(index),
            name: Some(header.name_lossy()),
            uncompressed_size: header.uncompressed_size,
            compressed_size: header.compressed_size,
            modification_time,
            checksum: Some(header.crc32),
            compression_method,
            encryption_method,
        }
    }

    /// Name of the codec, as shown to hosts
    pub fn compression_name(&self) -> Option<&'static str> {
        self.compression_method.map(CompressionMethod::name)
    }
}

/// Aggregate view of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    /// Number of entries
    pub entry_count: u64,
    /// Name of the first entry
    pub first_name: Option<String>,
    /// Name of the last entry
    pub last_name: Option<String>,
    /// Modification time of the first entry
    pub first_mtime: Option<DateTime<Utc>>,
    /// Modification time of the last entry
    pub last_mtime: Option<DateTime<Utc>>,
}

/// Entry written by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedEntry {
    /// Position in the container
    pub index: u64,
    /// Logical file name
    pub name: String,
    /// Codec used
    pub compression_method: CompressionMethod,
    /// CRC-32 of the source bytes
    pub checksum: u32,
    /// Source bytes read
    pub uncompressed_size: u64,
    /// Bytes stored
    pub compressed_size: u64,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Container path
    pub path: PathBuf,
    /// Entries in the container after the commit
    pub entry_count: u64,
    /// Entries added by this commit
    pub added: Vec<AddedEntry>,
    /// Container size in bytes (0 when nothing was written)
    pub container_size: u64,
}

/// An entry that failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyFailure {
    /// Entry position
    pub index: u64,
    /// Entry name
    pub name: String,
    /// Failure description
    pub reason: String,
}

/// Outcome of decompressing every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyInfo {
    /// Entries examined
    pub entries_checked: u64,
    /// Uncompressed bytes produced by intact entries
    pub bytes_checked: u64,
    /// Entries whose body did not decode to the recorded checksum and size
    pub failures: Vec<VerifyFailure>,
}

impl VerifyInfo {
    /// Whether every entry verified
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::records::FLAG_ENCRYPTED;

    fn header(method: u16, mtime: Option<i64>) -> CentralDirectoryHeader {
        CentralDirectoryHeader::for_new_entry(
            "000000010000000000000002",
            method,
            20,
            dostime::DOS_EPOCH,
            mtime,
            0x1234_5678,
            40,
            100,
            0,
        )
    }

    #[test]
    fn test_from_central_full_row() {
        let stat = EntryStat::from_central(3, &header(8, Some(1_700_000_000)));
        assert_eq!(stat.index, Some(3));
        assert_eq!(stat.name.as_deref(), Some("000000010000000000000002"));
        assert_eq!(stat.uncompressed_size, Some(100));
        assert_eq!(stat.compressed_size, Some(40));
        assert_eq!(
            stat.modification_time,
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
        assert_eq!(stat.checksum, Some(0x1234_5678));
        assert_eq!(stat.compression_method, Some(CompressionMethod::Zlib));
        assert_eq!(stat.compression_name(), Some("zlib"));
        assert_eq!(stat.encryption_method, Some(encryption::NONE));
    }

    #[test]
    fn test_unknown_codec_is_absent() {
        let stat = EntryStat::from_central(0, &header(14, None));
        assert_eq!(stat.compression_method, None);
        assert_eq!(stat.compression_name(), None);
    }

    #[test]
    fn test_mtime_falls_back_to_dos_fields() {
        let stat = EntryStat::from_central(0, &header(0, None));
        assert_eq!(
            stat.modification_time,
            dostime::from_dos(dostime::DOS_EPOCH.0, dostime::DOS_EPOCH.1)
        );

        let mut zero = header(0, None);
        zero.dos_date = 0;
        assert_eq!(EntryStat::from_central(0, &zero).modification_time, None);
    }

    #[test]
    fn test_encryption_codes() {
        let mut traditional = header(8, None);
        traditional.flags |= FLAG_ENCRYPTED;
        let stat = EntryStat::from_central(0, &traditional);
        assert_eq!(stat.encryption_method, Some(encryption::TRADITIONAL_PKWARE));
        assert_eq!(stat.compression_method, Some(CompressionMethod::Zlib));

        let mut aes = header(AES_METHOD, None);
        aes.flags |= FLAG_ENCRYPTED;
        aes.extra
            .extend_from_slice(&[0x01, 0x99, 7, 0, 2, 0, b'A', b'E', 3, 93, 0]);
        let stat = EntryStat::from_central(0, &aes);
        assert_eq!(stat.encryption_method, Some(0x0103));
        assert_eq!(stat.compression_method, Some(CompressionMethod::Zstd));

        let bare_aes = header(AES_METHOD, None);
        let stat = EntryStat::from_central(0, &bare_aes);
        assert_eq!(stat.encryption_method, None);
        assert_eq!(stat.compression_method, None);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ArchiveStats {
            entry_count: 0,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["entry_count"], 0);
        assert!(json["last_name"].is_null());
    }
}
