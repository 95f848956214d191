//! Advisory container lock.
//!
//! A sidecar `<container>.lock` file is locked with `flock`-style advisory
//! locks. The writer holds it exclusively from open until commit or drop;
//! readers hold it shared while they locate the central directory.
//!
//! Locks are per open file description, so a thread that holds a
//! [`ContainerWriter`](crate::ContainerWriter) must not open a reader on the
//! same container until the writer is gone.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path of the lock file guarding `container`.
pub fn lock_path(container: &Path) -> PathBuf {
    with_suffix(container, ".lock")
}

/// `path` with `suffix` appended to its final component.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Lock mode held by a [`ContainerLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Single writer
    Exclusive,
    /// Any number of readers
    Shared,
}

/// Held advisory lock; released on drop.
#[derive(Debug)]
pub struct ContainerLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl ContainerLock {
    /// Block until the exclusive lock on `container` is held.
    ///
    /// Creates the lock file if needed.
    pub fn exclusive(container: &Path) -> io::Result<Self> {
        let path = lock_path(container);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        fs2::FileExt::lock_exclusive(&file)?;
        debug!(target: "walzip::container", lock = %path.display(), "exclusive lock acquired");
        Ok(ContainerLock {
            file,
            path,
            mode: LockMode::Exclusive,
        })
    }

    /// Block until a shared lock on `container` is held.
    ///
    /// Returns `None` without creating anything when no lock file exists,
    /// which means no writer has ever run against the container.
    pub fn shared_if_present(container: &Path) -> io::Result<Option<Self>> {
        let path = lock_path(container);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        fs2::FileExt::lock_shared(&file)?;
        debug!(target: "walzip::container", lock = %path.display(), "shared lock acquired");
        Ok(Some(ContainerLock {
            file,
            path,
            mode: LockMode::Shared,
        }))
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode held
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for ContainerLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
