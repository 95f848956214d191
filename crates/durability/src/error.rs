//! Container error types

use crate::format::FormatError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walzip_core::CompressionMethod;

/// Stage of the open-modify-commit write sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Opening (or preparing to create) the container
    Open,
    /// Setting the container comment
    Comment,
    /// Staging the new entry
    AddEntry,
    /// Choosing the entry codec
    SetCompression,
    /// Writing and publishing the container
    Commit,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteStage::Open => "open",
            WriteStage::Comment => "set comment",
            WriteStage::AddEntry => "add entry",
            WriteStage::SetCompression => "set compression",
            WriteStage::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during container operations
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Container exists but could not be opened
    #[error("could not open archive \"{}\": {reason}", path.display())]
    Open {
        /// Container path
        path: PathBuf,
        /// Underlying diagnostic
        reason: String,
    },

    /// Container structure is damaged
    #[error("archive \"{}\" is corrupt: {reason}", path.display())]
    Corrupt {
        /// Container path
        path: PathBuf,
        /// What is wrong
        reason: String,
    },

    /// A write stage failed
    #[error("could not {stage} for archive \"{}\": {source}", path.display())]
    Stage {
        /// Failing stage
        stage: WriteStage,
        /// Container path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Box<ContainerError>,
    },

    /// Entry name cannot be stored
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidEntryName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Comment cannot be stored
    #[error("archive comment of {len} bytes exceeds {max} bytes")]
    InvalidComment {
        /// Comment length in bytes
        len: usize,
        /// Largest storable comment
        max: usize,
    },

    /// Source file cannot be archived
    #[error("cannot archive source \"{}\": {reason}", path.display())]
    InvalidSource {
        /// Source path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Level outside the codec's range
    #[error("compression level {level} is not valid for {method}")]
    InvalidCompressionLevel {
        /// Codec
        method: CompressionMethod,
        /// Rejected level
        level: u32,
    },

    /// Index past the last entry
    #[error("entry {index} not found (archive has {entry_count} entries)")]
    EntryNotFound {
        /// Requested index
        index: u64,
        /// Entries in the container
        entry_count: u64,
    },

    /// Entry was written by an earlier commit and can no longer change
    #[error("entry {index} is already committed")]
    EntryCommitted {
        /// Entry index
        index: u64,
    },

    /// Decompressed body does not match the recorded CRC-32
    #[error("checksum mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Entry name
        name: String,
        /// Recorded CRC-32
        expected: u32,
        /// Computed CRC-32
        actual: u32,
    },

    /// Decompressed body does not match the recorded size
    #[error("size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Entry name
        name: String,
        /// Recorded uncompressed size
        expected: u64,
        /// Bytes produced
        actual: u64,
    },

    /// Entry uses a codec or encryption this crate cannot read
    #[error("cannot read entry {name}: {reason}")]
    UnsupportedMethod {
        /// Entry name
        name: String,
        /// What is unsupported
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ContainerError {
    /// Create an open error
    pub fn open(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a corruption error
    pub fn corrupt(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Tag an error with the write stage it happened in
    pub fn stage(stage: WriteStage, path: &Path, source: ContainerError) -> Self {
        Self::Stage {
            stage,
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Classify a format error: I/O failures are open errors, anything
    /// structural is corruption.
    pub fn from_format(path: &Path, err: FormatError) -> Self {
        match err {
            FormatError::Io(e) => Self::open(path, e),
            other => Self::corrupt(path, other),
        }
    }

    /// Stage the error was raised in, if it came from a staged write
    pub fn write_stage(&self) -> Option<WriteStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error beneath any stage tags
    pub fn root(&self) -> &ContainerError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the container itself is damaged
    pub fn is_corrupt(&self) -> bool {
        matches!(self.root(), Self::Corrupt { .. })
    }
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;
