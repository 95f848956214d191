//! walzip - WAL segment archiving into a single ZIP container
//!
//! Completed write-ahead-log segments are appended, one entry per call, to
//! a standard ZIP file that any unzip tool can restore from. The container
//! can be inspected in place: aggregate statistics, a one-entry-per-step
//! cursor, extraction and verification.
//!
//! # Quick Start
//!
//! ```ignore
//! use walzip::{ArchiveConfig, Archiver, CompressionMethod};
//!
//! let config = ArchiveConfig::new("/var/lib/wal-archive")
//!     .with_compression(CompressionMethod::Zstd);
//! let archiver = Archiver::new(config)?;
//!
//! // `false` means "not archived, retry later"
//! let ok = archiver.archive_file("000000010000000000000001", segment_path);
//!
//! let stats = archiver.archive_stats()?;
//! for row in archiver.archived_segments()? {
//!     println!("{:?}", row?.name);
//! }
//! ```
//!
//! # Architecture
//!
//! - `walzip-core`: compression policy, configuration, destination resolution
//! - `walzip-durability`: ZIP container format, codecs, writer, reader, cursor
//! - this crate: the [`Archiver`] a host drives through [`ArchiveModule`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod archiver;
mod error;
mod module;

pub use archiver::{library_version, Archiver, LibraryVersions};
pub use error::{ArchiverError, ArchiverResult};
pub use module::ArchiveModule;

pub use walzip_core::{
    ArchiveConfig, ArchiveSettings, CompressionMethod, ConfigError, COMPRESSION_LEVEL,
    CONFIG_FILE_NAME,
};
pub use walzip_durability::{
    ArchiveStats, CommitInfo, ContainerError, EntryCursor, EntryStat, VerifyInfo, WriteStage,
};
