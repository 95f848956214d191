//! Archiver error types

use thiserror::Error;
use walzip_core::ConfigError;
use walzip_durability::ContainerError;

/// Errors returned by the [`Archiver`](crate::Archiver)
#[derive(Debug, Error)]
pub enum ArchiverError {
    /// No archive directory is configured
    #[error("archive_directory is not set")]
    NotConfigured,

    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Container operation failed
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl ArchiverError {
    /// Whether the error means archiving is switched off rather than failing
    pub fn is_not_configured(&self) -> bool {
        matches!(self, ArchiverError::NotConfigured)
    }
}

/// Result type for archiver operations
pub type ArchiverResult<T> = Result<T, ArchiverError>;
