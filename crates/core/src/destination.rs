//! Destination resolver and per-call settings snapshot
//!
//! The container path and comment are derived from configuration once per
//! configuration change. Writers and readers work from the resulting
//! [`ArchiveSettings`] rather than live configuration, so every operation
//! agrees on which file is "the" container for its whole duration.

use crate::compression::{CompressionMethod, COMPRESSION_LEVEL};
use crate::config::ArchiveConfig;
use std::path::{Path, PathBuf};

/// Container file stem used when no cluster name is configured.
pub const DEFAULT_CONTAINER_STEM: &str = "zip_archive";

/// Container file extension.
pub const CONTAINER_EXTENSION: &str = "zip";

/// Comment template written to every container.
pub const COMMENT_PREFIX: &str = "WAL archive";

/// Largest comment the container can carry (16-bit length field).
pub const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// Resolve the container path for a directory and optional cluster name.
///
/// `<directory>/<cluster_name>.zip` when the cluster name is non-empty,
/// `<directory>/zip_archive.zip` otherwise.
pub fn resolve_destination(directory: impl AsRef<Path>, cluster_name: Option<&str>) -> PathBuf {
    let stem = match cluster_name {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_CONTAINER_STEM,
    };
    directory
        .as_ref()
        .join(format!("{}.{}", stem, CONTAINER_EXTENSION))
}

/// Build the container comment for a cluster.
///
/// `"WAL archive"` or `"WAL archive for <cluster> cluster"`, truncated on a
/// character boundary to [`MAX_COMMENT_LEN`] bytes.
pub fn archive_comment(cluster_name: Option<&str>) -> String {
    let comment = match cluster_name {
        Some(name) if !name.is_empty() => format!("{} for {} cluster", COMMENT_PREFIX, name),
        _ => COMMENT_PREFIX.to_string(),
    };
    truncate_on_char_boundary(comment, MAX_COMMENT_LEN)
}

fn truncate_on_char_boundary(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut cut = max_len;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

/// Immutable settings resolved from one configuration generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Container path, `None` while archiving is disabled
    pub destination: Option<PathBuf>,
    /// Compression method for new entries
    pub compression_method: CompressionMethod,
    /// Compression level for new entries
    pub compression_level: u32,
    /// Container comment
    pub comment: String,
}

impl ArchiveSettings {
    /// Resolve settings from configuration.
    pub fn resolve(config: &ArchiveConfig) -> Self {
        let destination = config
            .is_enabled()
            .then(|| resolve_destination(&config.archive_directory, config.cluster()));
        ArchiveSettings {
            destination,
            compression_method: config.compression_method,
            compression_level: COMPRESSION_LEVEL,
            comment: archive_comment(config.cluster()),
        }
    }

    /// Whether a destination is available.
    pub fn is_configured(&self) -> bool {
        self.destination.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_with_cluster() {
        assert_eq!(
            resolve_destination("/tmp/arch", Some("main")),
            PathBuf::from("/tmp/arch/main.zip")
        );
    }

    #[test]
    fn test_destination_without_cluster() {
        assert_eq!(
            resolve_destination("/tmp/arch", None),
            PathBuf::from("/tmp/arch/zip_archive.zip")
        );
        assert_eq!(
            resolve_destination("/tmp/arch", Some("")),
            PathBuf::from("/tmp/arch/zip_archive.zip")
        );
    }

    #[test]
    fn test_comment_template() {
        assert_eq!(archive_comment(None), "WAL archive");
        assert_eq!(archive_comment(Some("")), "WAL archive");
        assert_eq!(archive_comment(Some("main")), "WAL archive for main cluster");
    }

    #[test]
    fn test_long_comment_truncated_on_char_boundary() {
        // 3-byte characters so the limit falls inside a character
        let cluster = "€".repeat(30_000);
        let comment = archive_comment(Some(&cluster));
        assert!(comment.len() <= MAX_COMMENT_LEN);
        assert!(comment.starts_with("WAL archive for €"));
        assert!(MAX_COMMENT_LEN - comment.len() < 3);
    }

    #[test]
    fn test_directory_used_as_written() {
        // blank means disabled, anything else is taken verbatim
        let settings = ArchiveSettings::resolve(&ArchiveConfig::new(" /tmp/arch "));
        assert_eq!(
            settings.destination,
            Some(PathBuf::from(" /tmp/arch ").join("zip_archive.zip"))
        );
        assert!(!ArchiveSettings::resolve(&ArchiveConfig::new("  ")).is_configured());
    }

    #[test]
    fn test_settings_disabled() {
        let settings = ArchiveSettings::resolve(&ArchiveConfig::default());
        assert!(!settings.is_configured());
        assert_eq!(settings.compression_method, CompressionMethod::Zlib);
        assert_eq!(settings.compression_level, COMPRESSION_LEVEL);
    }

    #[test]
    fn test_settings_enabled() {
        let config = ArchiveConfig::new("/tmp/arch")
            .with_compression(CompressionMethod::Zstd)
            .with_cluster_name("main");
        let settings = ArchiveSettings::resolve(&config);
        assert_eq!(settings.destination, Some(PathBuf::from("/tmp/arch/main.zip")));
        assert_eq!(settings.compression_method, CompressionMethod::Zstd);
        assert_eq!(settings.comment, "WAL archive for main cluster");
    }
}
