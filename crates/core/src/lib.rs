//! Core types for the WAL archive
//!
//! This crate holds everything the archiver decides before touching disk:
//! - CompressionMethod / CodecId: compression policy and codec mapping
//! - ArchiveConfig: `walzip.toml` configuration
//! - ArchiveSettings: destination path and comment resolved per config generation
//! - ConfigError: configuration error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod config;
pub mod destination;
pub mod error;

pub use compression::{CodecId, CompressionMethod, COMPRESSION_LEVEL};
pub use config::{ArchiveConfig, CONFIG_FILE_NAME};
pub use destination::{
    archive_comment, resolve_destination, ArchiveSettings, COMMENT_PREFIX,
    DEFAULT_CONTAINER_STEM, MAX_COMMENT_LEN,
};
pub use error::{ConfigError, ConfigResult};
