//! Container reader
//!
//! Opens the container read side, computes aggregate statistics and
//! decompresses entries. The central directory is walked one record at a
//! time, so memory use does not grow with the number of entries.

use crate::codec::{entry_decoder, CrcWriter};
use crate::error::{ContainerError, ContainerResult};
use crate::format::{
    locate_directory, CentralDirectoryHeader, ContainerDirectory, FormatError, LocalFileHeader,
};
use crate::lock::ContainerLock;
use crate::types::{ArchiveStats, EntryStat, VerifyFailure, VerifyInfo, AES_METHOD};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walzip_core::CompressionMethod;

/// Forward walk over central directory records.
///
/// The walker seeks to its own position before every record, so other reads
/// through the same handle may be interleaved between steps.
pub struct DirectoryWalker<R> {
    reader: R,
    offset: u64,
    cd_end: u64,
    next_index: u64,
    entry_count: u64,
}

impl<R: Read + Seek> DirectoryWalker<R> {
    /// Walk the directory described by `directory` through `reader`.
    pub fn new(reader: R, directory: &ContainerDirectory) -> Self {
        DirectoryWalker {
            reader,
            offset: directory.cd_offset,
            cd_end: directory.cd_offset + directory.cd_size,
            next_index: 0,
            entry_count: directory.entry_count,
        }
    }

    /// Index of the record the next step returns
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Read the next record; `None` once every entry has been returned.
    pub fn next_record(&mut self) -> Option<Result<(u64, CentralDirectoryHeader), FormatError>> {
        if self.next_index >= self.entry_count {
            return None;
        }
        Some(self.read_record())
    }

    fn read_record(&mut self) -> Result<(u64, CentralDirectoryHeader), FormatError> {
        self.reader.seek(SeekFrom::Start(self.offset))?;
        let remaining = self.cd_end.saturating_sub(self.offset);
        let mut bounded = BufReader::with_capacity(512, Read::by_ref(&mut self.reader).take(remaining));
        let header = CentralDirectoryHeader::read_from(&mut bounded)?;
        let index = self.next_index;
        self.offset += header.encoded_len() as u64;
        self.next_index += 1;
        Ok((index, header))
    }
}

/// Read side of one container.
///
/// A missing container opens as an empty one and is never created.
pub struct ContainerReader {
    path: PathBuf,
    file: Option<File>,
    directory: ContainerDirectory,
}

impl ContainerReader {
    /// Open the container at `path` and locate its central directory.
    ///
    /// A shared lock is held while the end records are read, so a
    /// concurrent commit is either fully visible or not at all.
    pub fn open(path: &Path) -> ContainerResult<Self> {
        let _lock = ContainerLock::shared_if_present(path).map_err(|e| ContainerError::open(path, e))?;

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "walzip::container", path = %path.display(), "no container yet");
                return Ok(ContainerReader {
                    path: path.to_path_buf(),
                    file: None,
                    directory: ContainerDirectory::empty(),
                });
            }
            Err(e) => return Err(ContainerError::open(path, e)),
        };
        let len = file
            .metadata()
            .map_err(|e| ContainerError::open(path, e))?
            .len();
        let directory = if len == 0 {
            ContainerDirectory::empty()
        } else {
            locate_directory(&mut file, len).map_err(|e| ContainerError::from_format(path, e))?
        };

        debug!(
            target: "walzip::container",
            path = %path.display(),
            entries = directory.entry_count,
            "container opened for reading"
        );

        Ok(ContainerReader {
            path: path.to_path_buf(),
            file: Some(file),
            directory,
        })
    }

    /// Container path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries
    pub fn entry_count(&self) -> u64 {
        self.directory.entry_count
    }

    /// Container comment, lossily decoded
    pub fn comment(&self) -> String {
        String::from_utf8_lossy(&self.directory.comment).into_owned()
    }

    /// Walk the central directory through a borrowed handle.
    fn walker(&self) -> Option<DirectoryWalker<&File>> {
        self.file
            .as_ref()
            .map(|file| DirectoryWalker::new(file, &self.directory))
    }

    /// Give the handle to a walker; `None` for an empty container.
    pub fn into_walker(self) -> Option<DirectoryWalker<File>> {
        let directory = self.directory;
        self.file
            .filter(|_| directory.entry_count > 0)
            .map(|file| DirectoryWalker::new(file, &directory))
    }

    fn corrupt(&self, err: FormatError) -> ContainerError {
        ContainerError::from_format(&self.path, err)
    }

    fn central(&self, index: u64) -> ContainerResult<CentralDirectoryHeader> {
        let entry_count = self.entry_count();
        if index >= entry_count {
            return Err(ContainerError::EntryNotFound { index, entry_count });
        }
        let mut walker = self
            .walker()
            .ok_or(ContainerError::EntryNotFound { index, entry_count })?;
        while let Some(record) = walker.next_record() {
            let (i, header) = record.map_err(|e| self.corrupt(e))?;
            if i == index {
                return Ok(header);
            }
        }
        Err(ContainerError::EntryNotFound { index, entry_count })
    }

    /// Metadata for the entry at `index`.
    pub fn stat_index(&self, index: u64) -> ContainerResult<EntryStat> {
        self.central(index)
            .map(|header| EntryStat::from_central(index, &header))
    }

    /// Aggregate statistics in one pass over the directory.
    pub fn stats(&self) -> ContainerResult<ArchiveStats> {
        let mut stats = ArchiveStats {
            entry_count: self.entry_count(),
            ..ArchiveStats::default()
        };
        let Some(mut walker) = self.walker() else {
            return Ok(stats);
        };

        let mut last = None;
        while let Some(record) = walker.next_record() {
            let (index, header) = record.map_err(|e| self.corrupt(e))?;
            let stat = EntryStat::from_central(index, &header);
            if index == 0 {
                stats.first_name = stat.name.clone();
                stats.first_mtime = stat.modification_time;
            }
            last = Some(stat);
        }
        if let Some(last) = last {
            stats.last_name = last.name;
            stats.last_mtime = last.modification_time;
        }
        Ok(stats)
    }

    /// Decompress the entry at `index` into memory.
    pub fn read_entry(&self, index: u64) -> ContainerResult<Vec<u8>> {
        let header = self.central(index)?;
        let capacity = header
            .uncompressed_size
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        let mut out = Vec::with_capacity(capacity);
        self.extract_header(&header, &mut out)?;
        Ok(out)
    }

    /// Decompress the entry at `index` into `out`, verifying CRC-32 and size.
    ///
    /// Returns the number of bytes written.
    pub fn extract_entry<W: Write>(&self, index: u64, out: &mut W) -> ContainerResult<u64> {
        let header = self.central(index)?;
        self.extract_header(&header, out)
    }

    /// Decompress every entry and report the ones that fail.
    pub fn verify(&self) -> ContainerResult<VerifyInfo> {
        let mut info = VerifyInfo::default();
        let Some(mut walker) = self.walker() else {
            return Ok(info);
        };
        while let Some(record) = walker.next_record() {
            let (index, header) = record.map_err(|e| self.corrupt(e))?;
            info.entries_checked += 1;
            match self.extract_header(&header, &mut io::sink()) {
                Ok(bytes) => info.bytes_checked += bytes,
                Err(e) => info.failures.push(VerifyFailure {
                    index,
                    name: header.name_lossy(),
                    reason: e.to_string(),
                }),
            }
        }
        debug!(
            target: "walzip::container",
            path = %self.path.display(),
            checked = info.entries_checked,
            failed = info.failures.len(),
            "container verified"
        );
        Ok(info)
    }

    fn extract_header<W: Write>(
        &self,
        header: &CentralDirectoryHeader,
        out: &mut W,
    ) -> ContainerResult<u64> {
        let name = header.name_lossy();
        let unsupported = |reason: String| ContainerError::UnsupportedMethod {
            name: name.clone(),
            reason,
        };
        if header.is_encrypted() || header.method == AES_METHOD {
            return Err(unsupported("entry is encrypted".to_string()));
        }
        let method = CompressionMethod::from_codec_id(header.method)
            .ok_or_else(|| unsupported(format!("unknown codec {}", header.method)))?;

        let missing = |field: &str| self.corrupt(FormatError::Inconsistent(format!("{name}: {field} unavailable")));
        let compressed = header.compressed_size.ok_or_else(|| missing("compressed size"))?;
        let expected_len = header
            .uncompressed_size
            .ok_or_else(|| missing("uncompressed size"))?;
        let offset = header
            .local_header_offset
            .ok_or_else(|| missing("local header offset"))?;

        let mut file = self
            .file
            .as_ref()
            .ok_or_else(|| missing("container data"))?;
        file.seek(SeekFrom::Start(offset))?;
        let local = LocalFileHeader::read_from(&mut BufReader::with_capacity(512, &mut file))
            .map_err(|e| self.corrupt(e))?;
        if local.name != header.name {
            return Err(self.corrupt(FormatError::Inconsistent(format!(
                "{name}: local header names a different entry"
            ))));
        }
        file.seek(SeekFrom::Start(offset + local.encoded_len() as u64))?;

        let body = BufReader::new(Read::by_ref(&mut file).take(compressed));
        let mut decoder = entry_decoder(method, body)?;
        let mut sink = CrcWriter::new(out);
        io::copy(&mut decoder, &mut sink).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof | io::ErrorKind::Other => {
                self.corrupt(FormatError::Inconsistent(format!("{name}: {e}")))
            }
            _ => ContainerError::Io(e),
        })?;
        let (_, actual_crc, actual_len) = sink.finish();

        if actual_len != expected_len {
            return Err(ContainerError::SizeMismatch {
                name,
                expected: expected_len,
                actual: actual_len,
            });
        }
        if actual_crc != header.crc32 {
            return Err(ContainerError::ChecksumMismatch {
                name,
                expected: header.crc32,
                actual: actual_crc,
            });
        }
        Ok(actual_len)
    }
}
