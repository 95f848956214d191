//! Archive configuration via `walzip.toml`
//!
//! Two reloadable settings drive the archiver: the directory holding the
//! container and the compression method for new entries. The cluster name is
//! supplied by the host and only disambiguates the container file name.

use crate::compression::CompressionMethod;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name looked up by hosts that keep settings on disk.
pub const CONFIG_FILE_NAME: &str = "walzip.toml";

/// Archive configuration loaded from `walzip.toml`.
///
/// # Example
///
/// ```toml
/// archive_directory = "/var/lib/wal-archive"
/// compression_method = "zstd"
/// cluster_name = "main"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArchiveConfig {
    /// Directory holding the container. Archiving is disabled while empty.
    #[serde(default)]
    pub archive_directory: String,
    /// Compression method applied to entries written from now on.
    #[serde(default)]
    pub compression_method: CompressionMethod,
    /// Cluster name; selects `<cluster_name>.zip` as the container file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

impl ArchiveConfig {
    /// Create a config archiving into `directory` with the default method.
    pub fn new(directory: impl Into<String>) -> Self {
        ArchiveConfig {
            archive_directory: directory.into(),
            ..Default::default()
        }
    }

    /// Set compression method (builder pattern)
    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression_method = method;
        self
    }

    /// Set cluster name (builder pattern)
    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    /// Whether archiving is enabled, i.e. a directory is configured.
    pub fn is_enabled(&self) -> bool {
        !self.archive_directory.trim().is_empty()
    }

    /// Cluster name if present and non-empty.
    pub fn cluster(&self) -> Option<&str> {
        self.cluster_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Validate configuration.
    ///
    /// The cluster name becomes a file name, so it may not contain path
    /// separators or NUL bytes, nor be `.` or `..`.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(name) = self.cluster() {
            let reason = if name.contains('/') || name.contains('\\') {
                Some("contains a path separator")
            } else if name.contains('\0') {
                Some("contains a NUL byte")
            } else if name == "." || name == ".." {
                Some("is a relative directory reference")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidClusterName {
                    name: name.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# WAL archive configuration
#
# Directory containing the ZIP container. Archiving is disabled while empty.
archive_directory = ""

# Compression method for newly archived segments:
#   "uncompressed", "bzip2", "zlib" (default), "xz" or "zstd"
# Changing it only affects segments archived after the reload.
compression_method = "zlib"

# Cluster name; the container is written to <archive_directory>/<cluster_name>.zip
# instead of <archive_directory>/zip_archive.zip.
# cluster_name = "main"
"#
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str, origin: &Path) -> ConfigResult<Self> {
        let config: ArchiveConfig =
            toml::from_str(content).map_err(|e| ConfigError::parse(origin, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&content, path)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| ConfigError::io(path, e))?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
    }
}
