//! Entry enumeration cursor

use crate::error::{ContainerError, ContainerResult};
use crate::reader::{ContainerReader, DirectoryWalker};
use crate::types::EntryStat;
use std::fs::File;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Forward-only cursor yielding one [`EntryStat`] per step, in container
/// order.
///
/// The container is opened once by [`open`](Self::open); the handle is
/// released after the last entry, after the first error, on
/// [`close`](Self::close) or on drop. Once done, `next()` keeps returning
/// `None`.
pub struct EntryCursor {
    path: PathBuf,
    walker: Option<DirectoryWalker<File>>,
    max_entries: u64,
    position: u64,
}

impl EntryCursor {
    /// Open the container at `path` for enumeration.
    ///
    /// A missing or empty container gives a cursor that is already done.
    pub fn open(path: &Path) -> ContainerResult<Self> {
        let reader = ContainerReader::open(path)?;
        let max_entries = reader.entry_count();
        Ok(EntryCursor {
            path: path.to_path_buf(),
            walker: reader.into_walker(),
            max_entries,
            position: 0,
        })
    }

    /// Entries the container held when the cursor was opened
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Entries yielded so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the cursor has released its handle
    pub fn is_done(&self) -> bool {
        self.walker.is_none()
    }

    /// Release the container handle; later calls yield nothing.
    pub fn close(&mut self) {
        if self.walker.take().is_some() {
            debug!(
                target: "walzip::container",
                path = %self.path.display(),
                position = self.position,
                "cursor closed early"
            );
        }
    }
}

impl Iterator for EntryCursor {
    type Item = ContainerResult<EntryStat>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.as_mut()?;
        match walker.next_record() {
            None => {
                self.walker = None;
                None
            }
            Some(Ok((index, header))) => {
                self.position += 1;
                if self.position >= self.max_entries {
                    self.walker = None;
                }
                Some(Ok(EntryStat::from_central(index, &header)))
            }
            Some(Err(e)) => {
                self.walker = None;
                Some(Err(ContainerError::from_format(&self.path, e)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.walker.is_none() {
            return (0, Some(0));
        }
        let left = usize::try_from(self.max_entries - self.position).unwrap_or(usize::MAX);
        // an error may end the walk early
        (0, Some(left))
    }
}

impl FusedIterator for EntryCursor {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_entry;
    use std::fs;
    use tempfile::TempDir;
    use walzip_core::CompressionMethod;

    fn archive(dir: &TempDir, container: &Path, names: &[&str]) {
        for name in names {
            let source = dir.path().join("src");
            fs::write(&source, name.as_bytes()).unwrap();
            write_entry(container, name, &source, CompressionMethod::Zlib, 1, "").unwrap();
        }
    }

    #[test]
    fn test_empty_container_is_done() {
        let dir = TempDir::new().unwrap();
        let mut cursor = EntryCursor::open(&dir.path().join("zip_archive.zip")).unwrap();
        assert_eq!(cursor.max_entries(), 0);
        assert!(cursor.is_done());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_yields_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("zip_archive.zip");
        archive(&dir, &container, &["c", "a", "b"]);

        let cursor = EntryCursor::open(&container).unwrap();
        assert_eq!(cursor.max_entries(), 3);
        let rows: Vec<EntryStat> = cursor.map(Result::unwrap).collect();
        let names: Vec<_> = rows.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, ["c", "a", "b"]);
        let indexes: Vec<_> = rows.iter().filter_map(|r| r.index).collect();
        assert_eq!(indexes, [0, 1, 2]);
    }

    #[test]
    fn test_done_after_last_entry() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("zip_archive.zip");
        archive(&dir, &container, &["only"]);

        let mut cursor = EntryCursor::open(&container).unwrap();
        assert!(!cursor.is_done());
        assert!(cursor.next().unwrap().is_ok());
        assert_eq!(cursor.position(), 1);
        assert!(cursor.is_done());
        assert!(cursor.next().is_none());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_close_early() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("zip_archive.zip");
        archive(&dir, &container, &["a", "b", "c"]);

        let mut cursor = EntryCursor::open(&container).unwrap();
        cursor.next();
        cursor.close();
        assert!(cursor.is_done());
        assert!(cursor.next().is_none());
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_snapshot_ignores_later_commits() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("zip_archive.zip");
        archive(&dir, &container, &["a"]);

        let cursor = EntryCursor::open(&container).unwrap();
        archive(&dir, &container, &["b"]);
        assert_eq!(cursor.count(), 1);
    }
}
