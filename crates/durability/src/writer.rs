//! Container writer
//!
//! Appends entries to the container with atomic write semantics. A commit
//! builds the next version of the container in a temporary sibling file:
//!
//! 1. Copy the existing entry region `[0, cd_offset)` verbatim
//! 2. Stream each new entry through its codec, then patch CRC and sizes into
//!    its local header
//! 3. Copy the existing central directory, append the new records
//! 4. Write the end records, fsync, rename over the container, fsync the
//!    parent directory
//!
//! The previous container stays untouched until the rename, so readers see
//! either the old or the new version, never a partial one.

use crate::codec::{CountingWriter, CrcWriter, EntryEncoder};
use crate::error::{ContainerError, ContainerResult, WriteStage};
use crate::format::extra::{self, ZIP64_LOCAL_DATA_SIZE};
use crate::format::records::{
    name_flags, saturate_u32, LOCAL_CRC_OFFSET, U32_SATURATED, VERSION_ZIP64,
};
use crate::format::{
    dostime, locate_directory, write_end_records, CentralDirectoryHeader, ContainerDirectory,
    LocalFileHeader, LOCAL_FILE_HEADER_SIZE,
};
use crate::lock::{with_suffix, ContainerLock};
use crate::types::{AddedEntry, CommitInfo};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walzip_core::{CompressionMethod, COMPRESSION_LEVEL, MAX_COMMENT_LEN};

/// Sources at least this large get a ZIP64 field reserved in their local
/// header, leaving room for codec overhead on incompressible data.
const LOCAL_ZIP64_THRESHOLD: u64 = 0xFF00_0000;

/// An entry staged for the next commit.
struct PendingEntry {
    name: String,
    source_path: PathBuf,
    source: File,
    source_len: u64,
    mtime: DateTime<Utc>,
    method: CompressionMethod,
    level: u32,
}

/// Staged writer over one container.
///
/// Holds the container's exclusive lock from [`open`](Self::open) until it
/// is committed or dropped. Dropping without committing discards every
/// staged change.
pub struct ContainerWriter {
    path: PathBuf,
    _lock: ContainerLock,
    exists: bool,
    directory: ContainerDirectory,
    comment: Option<Vec<u8>>,
    pending: Vec<PendingEntry>,
}

impl ContainerWriter {
    /// Open the container at `path`, or prepare to create it.
    ///
    /// A missing or zero-length file is treated as an empty container and
    /// is only created by a commit that adds entries.
    pub fn open(path: &Path) -> ContainerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ContainerError::open(path, e))?;
            }
        }

        let lock = ContainerLock::exclusive(path).map_err(|e| ContainerError::open(path, e))?;

        let (exists, directory) = match File::open(path) {
            Ok(mut file) => {
                let len = file
                    .metadata()
                    .map_err(|e| ContainerError::open(path, e))?
                    .len();
                if len == 0 {
                    (true, ContainerDirectory::empty())
                } else {
                    let directory = locate_directory(&mut file, len)
                        .map_err(|e| ContainerError::from_format(path, e))?;
                    (true, directory)
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (false, ContainerDirectory::empty()),
            Err(e) => return Err(ContainerError::open(path, e)),
        };

        debug!(
            target: "walzip::container",
            path = %path.display(),
            exists,
            entries = directory.entry_count,
            "container opened for writing"
        );

        Ok(ContainerWriter {
            path: path.to_path_buf(),
            _lock: lock,
            exists,
            directory,
            comment: None,
            pending: Vec::new(),
        })
    }

    /// Container path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries already committed to the container
    pub fn committed_entries(&self) -> u64 {
        self.directory.entry_count
    }

    /// Entries the container will hold after commit
    pub fn entry_count(&self) -> u64 {
        self.directory.entry_count + self.pending.len() as u64
    }

    /// Stage a new container comment.
    pub fn set_comment(&mut self, comment: &str) -> ContainerResult<()> {
        if comment.len() > MAX_COMMENT_LEN {
            return Err(ContainerError::InvalidComment {
                len: comment.len(),
                max: MAX_COMMENT_LEN,
            });
        }
        self.comment = Some(comment.as_bytes().to_vec());
        Ok(())
    }

    /// Stage the whole of `source` as a new entry named `name`.
    ///
    /// The source is opened now and read at commit. Returns the index the
    /// entry will have. Names are not deduplicated.
    pub fn add_file(&mut self, name: &str, source: &Path) -> ContainerResult<u64> {
        if name.is_empty() {
            return Err(ContainerError::InvalidEntryName {
                name: name.to_string(),
                reason: "name is empty",
            });
        }
        if name.len() > usize::from(u16::MAX) {
            return Err(ContainerError::InvalidEntryName {
                name: name.to_string(),
                reason: "name is longer than 65535 bytes",
            });
        }

        let invalid = |reason: String| ContainerError::InvalidSource {
            path: source.to_path_buf(),
            reason,
        };
        let file = File::open(source).map_err(|e| invalid(e.to_string()))?;
        let metadata = file.metadata().map_err(|e| invalid(e.to_string()))?;
        if !metadata.is_file() {
            return Err(invalid("not a regular file".to_string()));
        }
        let mtime = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let index = self.entry_count();
        self.pending.push(PendingEntry {
            name: name.to_string(),
            source_path: source.to_path_buf(),
            source: file,
            source_len: metadata.len(),
            mtime,
            method: CompressionMethod::default(),
            level: COMPRESSION_LEVEL,
        });
        Ok(index)
    }

    /// Choose the codec for a staged entry.
    ///
    /// The level is checked against the codec's range and ignored for
    /// uncompressed entries.
    pub fn set_compression(
        &mut self,
        index: u64,
        method: CompressionMethod,
        level: u32,
    ) -> ContainerResult<()> {
        if !method.accepts_level(level) {
            return Err(ContainerError::InvalidCompressionLevel { method, level });
        }
        let entry_count = self.entry_count();
        let slot = index
            .checked_sub(self.directory.entry_count)
            .ok_or(ContainerError::EntryCommitted { index })?;
        let entry = usize::try_from(slot)
            .ok()
            .and_then(|slot| self.pending.get_mut(slot))
            .ok_or(ContainerError::EntryNotFound { index, entry_count })?;
        entry.method = method;
        entry.level = level;
        Ok(())
    }

    /// Write the staged changes and publish the new container.
    ///
    /// Nothing is written when no entry is staged and the comment is
    /// unchanged, or when the container would hold no entries.
    pub fn commit(mut self) -> ContainerResult<CommitInfo> {
        let comment_changed = self
            .comment
            .as_ref()
            .is_some_and(|c| *c != self.directory.comment);
        if (self.pending.is_empty() && !comment_changed) || self.entry_count() == 0 {
            debug!(target: "walzip::container", path = %self.path.display(), "nothing to commit");
            let container_size = if self.exists {
                fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };
            return Ok(CommitInfo {
                path: self.path.clone(),
                entry_count: self.directory.entry_count,
                added: Vec::new(),
                container_size,
            });
        }

        let temp_path = with_suffix(&self.path, ".tmp");
        match self.write_temp(&temp_path) {
            Ok(info) => {
                fs::rename(&temp_path, &self.path).map_err(|e| {
                    let _ = fs::remove_file(&temp_path);
                    ContainerError::Io(e)
                })?;
                sync_parent(&self.path)?;
                info!(
                    target: "walzip::container",
                    path = %self.path.display(),
                    entries = info.entry_count,
                    added = info.added.len(),
                    bytes = info.container_size,
                    "container committed"
                );
                Ok(info)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    fn write_temp(&mut self, temp_path: &Path) -> ContainerResult<CommitInfo> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(temp_path)?;
        let mut out = BufWriter::new(file);

        let mut previous = if self.exists && self.directory.entry_count > 0 {
            Some(File::open(&self.path)?)
        } else {
            None
        };

        // Existing entries keep their offsets
        let mut pos = 0u64;
        if let Some(source) = previous.as_mut() {
            pos = copy_range(source, &mut out, 0, self.directory.cd_offset)?;
            if pos != self.directory.cd_offset {
                return Err(ContainerError::corrupt(&self.path, "entry region is truncated"));
            }
        }

        let first_index = self.directory.entry_count;
        let mut central = Vec::with_capacity(self.pending.len());
        let mut added = Vec::with_capacity(self.pending.len());
        for (i, entry) in self.pending.iter_mut().enumerate() {
            let header_offset = pos;
            let (record, written, stored) = write_entry_body(&mut out, header_offset, entry)?;
            pos += written;
            added.push(AddedEntry {
                index: first_index + i as u64,
                name: entry.name.clone(),
                compression_method: entry.method,
                checksum: record.crc32,
                uncompressed_size: record.uncompressed_size.unwrap_or(0),
                compressed_size: stored,
            });
            debug!(
                target: "walzip::container",
                name = %entry.name,
                source = %entry.source_path.display(),
                method = %entry.method,
                offset = header_offset,
                "entry written"
            );
            central.push(record);
        }

        let cd_offset = pos;
        if let Some(source) = previous.as_mut() {
            let copied = copy_range(
                source,
                &mut out,
                self.directory.cd_offset,
                self.directory.cd_size,
            )?;
            if copied != self.directory.cd_size {
                return Err(ContainerError::corrupt(&self.path, "central directory is truncated"));
            }
            pos += copied;
        }
        for record in &central {
            let bytes = record.to_bytes();
            out.write_all(&bytes)?;
            pos += bytes.len() as u64;
        }
        let cd_size = pos - cd_offset;

        let entry_count = self.entry_count();
        let comment = self
            .comment
            .as_deref()
            .unwrap_or(self.directory.comment.as_slice());
        pos += write_end_records(&mut out, entry_count, cd_offset, cd_size, comment)?;

        let file = out.into_inner().map_err(|e| ContainerError::Io(e.into_error()))?;
        file.sync_all()?;

        Ok(CommitInfo {
            path: self.path.clone(),
            entry_count,
            added,
            container_size: pos,
        })
    }
}

/// Write one local header and body at `header_offset`.
///
/// Returns the central record, total bytes written and compressed size.
fn write_entry_body<W: Write + Seek>(
    out: &mut W,
    header_offset: u64,
    entry: &mut PendingEntry,
) -> ContainerResult<(CentralDirectoryHeader, u64, u64)> {
    let zip64_local = entry.source_len >= LOCAL_ZIP64_THRESHOLD;
    let mut version_needed = entry.method.version_needed();
    if zip64_local {
        version_needed = version_needed.max(VERSION_ZIP64);
    }

    let mtime = entry.mtime.timestamp();
    let dos = dostime::to_dos(entry.mtime);
    let mut extra_block = Vec::new();
    extra::push_extended_timestamp(&mut extra_block, mtime);
    let zip64_data = zip64_local.then(|| extra::push_zip64_local_placeholder(&mut extra_block));

    let header = LocalFileHeader {
        version_needed,
        flags: name_flags(&entry.name),
        method: entry.method.codec_id().as_u16(),
        dos_time: dos.0,
        dos_date: dos.1,
        crc32: 0,
        compressed_size: if zip64_local { U32_SATURATED } else { 0 },
        uncompressed_size: if zip64_local { U32_SATURATED } else { 0 },
        name: entry.name.as_bytes().to_vec(),
        extra: extra_block,
    };
    let header_len = header.encoded_len() as u64;
    out.write_all(&header.to_bytes())?;

    let counter = CountingWriter::new(&mut *out);
    let encoder = EntryEncoder::new(entry.method, entry.level, counter)?;
    let mut sink = CrcWriter::new(encoder);
    io::copy(&mut entry.source, &mut sink)?;
    let (encoder, crc32, uncompressed) = sink.finish();
    let compressed = encoder.finish()?.count();

    let overflow = |v: u64| saturate_u32(v) == U32_SATURATED;
    if !zip64_local && (overflow(uncompressed) || overflow(compressed)) {
        return Err(ContainerError::InvalidSource {
            path: entry.source_path.clone(),
            reason: format!("grew to {} bytes while being archived", uncompressed),
        });
    }

    // Patch the local header now that CRC and sizes are known
    let body_end = header_offset + header_len + compressed;
    out.seek(SeekFrom::Start(header_offset + LOCAL_CRC_OFFSET))?;
    out.write_all(&crc32.to_le_bytes())?;
    if let Some(data_at) = zip64_data {
        let at = header_offset
            + LOCAL_FILE_HEADER_SIZE as u64
            + header.name.len() as u64
            + data_at as u64;
        out.seek(SeekFrom::Start(at))?;
        let mut sizes = [0u8; ZIP64_LOCAL_DATA_SIZE];
        sizes[0..8].copy_from_slice(&uncompressed.to_le_bytes());
        sizes[8..16].copy_from_slice(&compressed.to_le_bytes());
        out.write_all(&sizes)?;
    } else {
        out.write_all(&(compressed as u32).to_le_bytes())?;
        out.write_all(&(uncompressed as u32).to_le_bytes())?;
    }
    out.seek(SeekFrom::Start(body_end))?;

    let record = CentralDirectoryHeader::for_new_entry(
        &entry.name,
        header.method,
        version_needed,
        dos,
        Some(mtime),
        crc32,
        compressed,
        uncompressed,
        header_offset,
    );
    Ok((record, header_len + compressed, compressed))
}

/// Copy `len` bytes starting at `offset`; returns the bytes actually copied.
fn copy_range<W: Write>(source: &mut File, out: &mut W, offset: u64, len: u64) -> io::Result<u64> {
    source.seek(SeekFrom::Start(offset))?;
    io::copy(&mut Read::by_ref(source).take(len), out)
}

fn sync_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

/// Append `source` to the container at `path` as entry `name`.
///
/// Runs open, comment, add, compression and commit in order. A failure is
/// tagged with its [`WriteStage`]; the container is unchanged unless the
/// commit succeeds.
pub fn write_entry(
    path: &Path,
    name: &str,
    source: &Path,
    method: CompressionMethod,
    level: u32,
    comment: &str,
) -> ContainerResult<CommitInfo> {
    let stage = |stage: WriteStage| move |e: ContainerError| ContainerError::stage(stage, path, e);

    let mut writer = ContainerWriter::open(path).map_err(stage(WriteStage::Open))?;
    writer
        .set_comment(comment)
        .map_err(stage(WriteStage::Comment))?;
    let index = writer
        .add_file(name, source)
        .map_err(stage(WriteStage::AddEntry))?;
    writer
        .set_compression(index, method, level)
        .map_err(stage(WriteStage::SetCompression))?;
    writer.commit().map_err(stage(WriteStage::Commit))
}
