//! Compression policy
//!
//! Maps the configured symbolic compression method onto the codec identifier
//! stored in each container entry, and back again when entries are listed.
//!
//! | Method | Codec id | Version needed to extract |
//! |--------|----------|---------------------------|
//! | `uncompressed` | 0 (stored) | 1.0 |
//! | `zlib` | 8 (deflate) | 2.0 |
//! | `bzip2` | 12 | 4.6 |
//! | `zstd` | 93 | 6.3 |
//! | `xz` | 95 | 6.3 |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Compression level applied to every new entry.
///
/// The minimum non-zero level: WAL segments are archived on the hot path of
/// the host, so speed wins over ratio. Ignored for [`CompressionMethod::Uncompressed`].
pub const COMPRESSION_LEVEL: u32 = 1;

/// Codec identifier as stored in container headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecId(pub u16);

impl CodecId {
    /// Stored (no compression).
    pub const STORED: CodecId = CodecId(0);
    /// Raw deflate stream.
    pub const DEFLATE: CodecId = CodecId(8);
    /// bzip2 stream.
    pub const BZIP2: CodecId = CodecId(12);
    /// Zstandard frame.
    pub const ZSTD: CodecId = CodecId(93);
    /// xz container stream.
    pub const XZ: CodecId = CodecId(95);

    /// Raw header value.
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compression method selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// Store the segment as-is
    Uncompressed,
    /// bzip2
    Bzip2,
    /// Deflate (the zlib algorithm without the zlib wrapper)
    #[default]
    Zlib,
    /// xz / LZMA2
    Xz,
    /// Zstandard
    Zstd,
}

impl CompressionMethod {
    /// Every method, in configuration order.
    pub const ALL: [CompressionMethod; 5] = [
        CompressionMethod::Uncompressed,
        CompressionMethod::Bzip2,
        CompressionMethod::Zlib,
        CompressionMethod::Xz,
        CompressionMethod::Zstd,
    ];

    /// Configuration name of this method.
    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::Uncompressed => "uncompressed",
            CompressionMethod::Bzip2 => "bzip2",
            CompressionMethod::Zlib => "zlib",
            CompressionMethod::Xz => "xz",
            CompressionMethod::Zstd => "zstd",
        }
    }

    /// Codec identifier written into the entry headers.
    pub fn codec_id(self) -> CodecId {
        match self {
            CompressionMethod::Uncompressed => CodecId::STORED,
            CompressionMethod::Bzip2 => CodecId::BZIP2,
            CompressionMethod::Zlib => CodecId::DEFLATE,
            CompressionMethod::Xz => CodecId::XZ,
            CompressionMethod::Zstd => CodecId::ZSTD,
        }
    }

    /// Map a stored codec identifier back to its method.
    ///
    /// Returns `None` for codecs this crate never writes (e.g. entries added
    /// to the container by another tool).
    pub fn from_codec_id(id: u16) -> Option<Self> {
        match CodecId(id) {
            CodecId::STORED => Some(CompressionMethod::Uncompressed),
            CodecId::BZIP2 => Some(CompressionMethod::Bzip2),
            CodecId::DEFLATE => Some(CompressionMethod::Zlib),
            CodecId::XZ => Some(CompressionMethod::Xz),
            CodecId::ZSTD => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }

    /// Minimum "version needed to extract" for entries using this method,
    /// encoded as `major * 10 + minor`.
    pub fn version_needed(self) -> u16 {
        match self {
            CompressionMethod::Uncompressed => 10,
            CompressionMethod::Zlib => 20,
            CompressionMethod::Bzip2 => 46,
            CompressionMethod::Xz | CompressionMethod::Zstd => 63,
        }
    }

    /// Levels accepted by the codec. `None` when the method takes no level.
    pub fn level_range(self) -> Option<RangeInclusive<u32>> {
        match self {
            CompressionMethod::Uncompressed => None,
            CompressionMethod::Bzip2 => Some(1..=9),
            CompressionMethod::Zlib => Some(1..=9),
            CompressionMethod::Xz => Some(0..=9),
            CompressionMethod::Zstd => Some(1..=22),
        }
    }

    /// Check whether `level` is usable with this method.
    pub fn accepts_level(self, level: u32) -> bool {
        match self.level_range() {
            Some(range) => range.contains(&level),
            None => true,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompressionMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ConfigError::UnknownCompressionMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zlib() {
        assert_eq!(CompressionMethod::default(), CompressionMethod::Zlib);
    }

    #[test]
    fn test_codec_ids() {
        assert_eq!(CompressionMethod::Uncompressed.codec_id(), CodecId(0));
        assert_eq!(CompressionMethod::Zlib.codec_id(), CodecId(8));
        assert_eq!(CompressionMethod::Bzip2.codec_id(), CodecId(12));
        assert_eq!(CompressionMethod::Zstd.codec_id(), CodecId(93));
        assert_eq!(CompressionMethod::Xz.codec_id(), CodecId(95));
    }

    #[test]
    fn test_codec_id_reverse_mapping() {
        for method in CompressionMethod::ALL {
            let id = method.codec_id().as_u16();
            assert_eq!(CompressionMethod::from_codec_id(id), Some(method));
        }
        // LZMA (14) and AES (99) are valid container codecs we never write
        assert_eq!(CompressionMethod::from_codec_id(14), None);
        assert_eq!(CompressionMethod::from_codec_id(99), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "uncompressed".parse::<CompressionMethod>().unwrap(),
            CompressionMethod::Uncompressed
        );
        assert_eq!("bzip2".parse::<CompressionMethod>().unwrap(), CompressionMethod::Bzip2);

        let err = "lz4".parse::<CompressionMethod>().unwrap_err();
        assert!(err.to_string().contains("lz4"));
    }

    #[test]
    fn test_name_display_roundtrip() {
        for method in CompressionMethod::ALL {
            assert_eq!(method.to_string().parse::<CompressionMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_fixed_level_accepted_everywhere() {
        for method in CompressionMethod::ALL {
            assert!(method.accepts_level(COMPRESSION_LEVEL), "{}", method);
        }
        assert!(!CompressionMethod::Zlib.accepts_level(10));
        assert!(!CompressionMethod::Bzip2.accepts_level(0));
        assert!(CompressionMethod::Uncompressed.accepts_level(42));
    }

    #[test]
    fn test_parse_matches_serde_names() {
        // names are exact, the same rule the config file applies
        for input in ["zstd", "ZSTD", " zstd ", "Zlib"] {
            let parsed = input.parse::<CompressionMethod>().ok();
            let deserialized = serde_json::from_str::<CompressionMethod>(&format!("\"{input}\"")).ok();
            assert_eq!(parsed, deserialized, "{input:?}");
        }
        assert!("ZSTD".parse::<CompressionMethod>().is_err());
        assert!(" zstd ".parse::<CompressionMethod>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&CompressionMethod::Xz).unwrap();
        assert_eq!(json, "\"xz\"");
        let parsed: CompressionMethod = serde_json::from_str("\"uncompressed\"").unwrap();
        assert_eq!(parsed, CompressionMethod::Uncompressed);
    }
}
