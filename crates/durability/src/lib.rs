//! Durability layer for the WAL archive
//!
//! This crate handles everything that touches disk:
//!
//! - Container format: standard ZIP records (local headers, central
//!   directory, end records with ZIP64 when needed)
//! - Codecs: streaming stored/deflate/bzip2/xz/zstd entry bodies
//! - Container lock: advisory sidecar lock shared by writer and readers
//! - Writer: staged open/comment/add/compression/commit with atomic publish
//! - Reader: statistics, entry extraction and verification
//! - Cursor: one-entry-per-step enumeration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec; // Streaming entry codecs
pub mod cursor; // Entry enumeration cursor
pub mod error; // ContainerError, WriteStage
pub mod format; // On-disk ZIP records
pub mod lock; // Advisory container lock
pub mod reader; // Read side, statistics, extraction
pub mod types; // EntryStat, ArchiveStats, CommitInfo, VerifyInfo
pub mod writer; // Staged writer with atomic commit

// === Re-exports ===
pub use codec::{entry_decoder, zstd_version, CountingWriter, CrcWriter, EntryEncoder};
pub use cursor::EntryCursor;
pub use error::{ContainerError, ContainerResult, WriteStage};
pub use format::{ContainerDirectory, FormatError};
pub use lock::{lock_path, ContainerLock, LockMode};
pub use reader::{ContainerReader, DirectoryWalker};
pub use types::{
    encryption, AddedEntry, ArchiveStats, CommitInfo, EntryStat, VerifyFailure, VerifyInfo,
};
pub use writer::{write_entry, ContainerWriter};
