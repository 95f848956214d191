//! Host-facing archiver
//!
//! Holds the reloadable configuration and the settings resolved from it.
//! Every call takes one [`ArchiveSettings`] snapshot at its start, so a
//! reload racing with an in-flight call never changes that call's container
//! path or codec.

use crate::error::{ArchiverError, ArchiverResult};
use crate::module::ArchiveModule;
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walzip_core::{ArchiveConfig, ArchiveSettings};
use walzip_durability::{
    write_entry, zstd_version, ArchiveStats, CommitInfo, ContainerReader, EntryCursor,
    VerifyInfo,
};

/// Version of this library
pub fn library_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Versions of this library and of the codec libraries it links.
///
/// deflate, bzip2 and xz expose no runtime version, so only zstd is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryVersions {
    /// walzip crate version
    pub walzip: &'static str,
    /// Linked zstd library version
    pub zstd: &'static str,
}

impl LibraryVersions {
    /// Query the running versions.
    pub fn current() -> Self {
        LibraryVersions {
            walzip: library_version(),
            zstd: zstd_version(),
        }
    }
}

impl fmt::Display for LibraryVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "walzip {} (zstd {})", self.walzip, self.zstd)
    }
}

/// WAL segment archiver writing into a single ZIP container.
pub struct Archiver {
    config: RwLock<ArchiveConfig>,
    settings: RwLock<Arc<ArchiveSettings>>,
}

impl Archiver {
    /// Create an archiver from a validated configuration.
    pub fn new(config: ArchiveConfig) -> ArchiverResult<Self> {
        config.validate()?;
        let settings = Arc::new(ArchiveSettings::resolve(&config));
        log_settings(&settings);
        Ok(Archiver {
            config: RwLock::new(config),
            settings: RwLock::new(settings),
        })
    }

    /// Create an archiver from a `walzip.toml` file.
    pub fn from_config_file(path: &Path) -> ArchiverResult<Self> {
        Self::new(ArchiveConfig::from_file(path)?)
    }

    /// Replace the configuration; calls already running keep their snapshot.
    ///
    /// An invalid configuration is rejected and the current one kept.
    pub fn reload(&self, config: ArchiveConfig) -> ArchiverResult<()> {
        config.validate()?;
        let settings = Arc::new(ArchiveSettings::resolve(&config));
        log_settings(&settings);
        // Config and settings are swapped under the config lock so that
        // concurrent reloads publish in the same order for both.
        let mut guard = self.config.write();
        *self.settings.write() = settings;
        *guard = config;
        Ok(())
    }

    /// Re-read `walzip.toml` and apply it.
    pub fn reload_from_file(&self, path: &Path) -> ArchiverResult<()> {
        let config = ArchiveConfig::from_file(path)?;
        self.reload(config)?;
        info!(target: "walzip::archive", config = %path.display(), "configuration reloaded");
        Ok(())
    }

    /// Current configuration
    pub fn config(&self) -> ArchiveConfig {
        self.config.read().clone()
    }

    /// Settings snapshot for one call
    pub fn settings(&self) -> Arc<ArchiveSettings> {
        Arc::clone(&self.settings.read())
    }

    /// Container path, `None` while archiving is disabled
    pub fn destination(&self) -> Option<PathBuf> {
        self.settings().destination.clone()
    }

    /// Whether an archive directory is configured
    pub fn is_configured(&self) -> bool {
        self.settings().is_configured()
    }

    /// Archive `path` as entry `file`; `false` means "not archived, retry".
    ///
    /// Failures are logged with their stage and the container path.
    pub fn archive_file(&self, file: &str, path: &Path) -> bool {
        match self.try_archive_file(file, path) {
            Ok(info) => {
                info!(
                    target: "walzip::archive",
                    file,
                    container = %info.path.display(),
                    entries = info.entry_count,
                    "archived segment"
                );
                true
            }
            Err(e) => {
                error!(
                    target: "walzip::archive",
                    file,
                    source = %path.display(),
                    error = %e,
                    "failed to archive segment"
                );
                false
            }
        }
    }

    /// Archive `path` as entry `file`, returning what was committed.
    pub fn try_archive_file(&self, file: &str, path: &Path) -> ArchiverResult<CommitInfo> {
        let settings = self.settings();
        let destination = settings
            .destination
            .as_deref()
            .ok_or(ArchiverError::NotConfigured)?;
        let info = write_entry(
            destination,
            file,
            path,
            settings.compression_method,
            settings.compression_level,
            &settings.comment,
        )?;
        Ok(info)
    }

    /// Aggregate statistics of the container.
    pub fn archive_stats(&self) -> ArchiverResult<ArchiveStats> {
        let reader = self.open_reader()?;
        Ok(reader.stats()?)
    }

    /// Cursor over every archived segment, in archive order.
    pub fn archived_segments(&self) -> ArchiverResult<EntryCursor> {
        let destination = self.require_destination()?;
        Ok(EntryCursor::open(&destination)?)
    }

    /// Decompressed contents of the segment at `index`.
    pub fn read_segment(&self, index: u64) -> ArchiverResult<Vec<u8>> {
        let reader = self.open_reader()?;
        Ok(reader.read_entry(index)?)
    }

    /// Decompress every segment and check its checksum.
    pub fn verify(&self) -> ArchiverResult<VerifyInfo> {
        let reader = self.open_reader()?;
        let info = reader.verify()?;
        if !info.is_ok() {
            warn!(
                target: "walzip::archive",
                container = %reader.path().display(),
                failures = info.failures.len(),
                "archive verification found damaged segments"
            );
        }
        Ok(info)
    }

    fn require_destination(&self) -> ArchiverResult<PathBuf> {
        self.destination().ok_or(ArchiverError::NotConfigured)
    }

    fn open_reader(&self) -> ArchiverResult<ContainerReader> {
        let destination = self.require_destination()?;
        Ok(ContainerReader::open(&destination)?)
    }
}

impl ArchiveModule for Archiver {
    fn check_configured(&self) -> bool {
        let configured = self.is_configured();
        if !configured {
            warn!(target: "walzip::archive", "archive_directory is not set");
        }
        configured
    }

    fn archive_file(&self, file: &str, path: &Path) -> bool {
        Archiver::archive_file(self, file, path)
    }
}

fn log_settings(settings: &ArchiveSettings) {
    match &settings.destination {
        Some(destination) => debug!(
            target: "walzip::archive",
            destination = %destination.display(),
            method = %settings.compression_method,
            "archive settings resolved"
        ),
        None => debug!(target: "walzip::archive", "archiving disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use walzip_core::CompressionMethod;

    fn archiver(dir: &TempDir) -> Archiver {
        Archiver::new(ArchiveConfig::new(dir.path().to_string_lossy())).unwrap()
    }

    #[test]
    fn test_unconfigured_archiver() {
        let archiver = Archiver::new(ArchiveConfig::default()).unwrap();
        assert!(!archiver.is_configured());
        assert!(!archiver.check_configured());
        assert!(archiver.destination().is_none());
        assert!(archiver.archive_stats().unwrap_err().is_not_configured());
        assert!(!archiver.archive_file("seg", Path::new("/nonexistent")));
    }

    #[test]
    fn test_destination_follows_cluster_name() {
        let dir = TempDir::new().unwrap();
        let archiver = archiver(&dir);
        assert_eq!(
            archiver.destination(),
            Some(dir.path().join("zip_archive.zip"))
        );

        let config = ArchiveConfig::new(dir.path().to_string_lossy()).with_cluster_name("main");
        archiver.reload(config).unwrap();
        assert_eq!(archiver.destination(), Some(dir.path().join("main.zip")));
        assert_eq!(archiver.settings().comment, "WAL archive for main cluster");
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = TempDir::new().unwrap();
        let archiver = archiver(&dir);
        let before = archiver.settings();

        let config = ArchiveConfig::new(dir.path().to_string_lossy())
            .with_compression(CompressionMethod::Zstd);
        archiver.reload(config).unwrap();

        assert_eq!(before.compression_method, CompressionMethod::Zlib);
        assert_eq!(archiver.settings().compression_method, CompressionMethod::Zstd);
    }

    #[test]
    fn test_invalid_reload_keeps_config() {
        let dir = TempDir::new().unwrap();
        let archiver = archiver(&dir);
        let bad = ArchiveConfig::new(dir.path().to_string_lossy()).with_cluster_name("../x");
        assert!(matches!(archiver.reload(bad), Err(ArchiverError::Config(_))));
        assert_eq!(
            archiver.destination(),
            Some(dir.path().join("zip_archive.zip"))
        );
    }

    #[test]
    fn test_archive_and_read_back() {
        let dir = TempDir::new().unwrap();
        let archiver = archiver(&dir);
        let source = dir.path().join("000000010000000000000001");
        fs::write(&source, b"wal bytes").unwrap();

        assert!(ArchiveModule::archive_file(
            &archiver,
            "000000010000000000000001",
            &source
        ));
        assert_eq!(archiver.read_segment(0).unwrap(), b"wal bytes");
        assert!(archiver.verify().unwrap().is_ok());
        archiver.shutdown();
    }

    #[test]
    fn test_library_version() {
        assert_eq!(library_version(), env!("CARGO_PKG_VERSION"));
        assert!(!library_version().is_empty());
    }

    #[test]
    fn test_library_versions_include_codec() {
        let versions = LibraryVersions::current();
        assert_eq!(versions.walzip, library_version());
        assert!(!versions.zstd.is_empty());
        assert_eq!(
            versions.to_string(),
            format!("walzip {} (zstd {})", library_version(), versions.zstd)
        );
    }
}
