//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating archive configuration.
///
/// These are configuration-time failures: a value that makes it past
/// [`crate::ArchiveConfig::validate`] never produces one of these later.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Compression method name not recognised
    #[error("Invalid compression method '{0}'. Expected one of: uncompressed, bzip2, zlib, xz, zstd")]
    UnknownCompressionMethod(String),

    /// Config file could not be read or written
    #[error("Failed to access config file '{}': {source}", path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unexpected keys/values
    #[error("Failed to parse config file '{}': {reason}", path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser diagnostic
        reason: String,
    },

    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// Cluster name cannot be used as a file name
    #[error("Invalid cluster name '{name}': {reason}")]
    InvalidClusterName {
        /// Offending cluster name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl ConfigError {
    /// Create an I/O error for a config path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for a config path
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::UnknownCompressionMethod("lz4".to_string());
        assert!(err.to_string().contains("lz4"));
        assert!(err.to_string().contains("zstd"));

        let err = ConfigError::parse("/etc/walzip.toml", "expected `=`");
        assert!(err.to_string().contains("/etc/walzip.toml"));
        assert!(err.to_string().contains("expected `=`"));

        let err = ConfigError::InvalidClusterName {
            name: "a/b".to_string(),
            reason: "contains a path separator",
        };
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn test_io_constructor() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ConfigError::io("walzip.toml", io_err);
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing"));
    }
}
