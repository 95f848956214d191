//! Archive module callbacks
//!
//! The host drives archiving through three callbacks: a configured check
//! before each round, one archive call per ready segment, and shutdown.

use std::path::Path;

/// Callback surface a host process uses to drive an archiver.
pub trait ArchiveModule: Send + Sync {
    /// Whether archiving can run with the current configuration.
    ///
    /// Hosts skip the round (and retry later) when this is `false`.
    fn check_configured(&self) -> bool;

    /// Archive the segment at `path` under the logical name `file`.
    ///
    /// `true` means the segment is durably archived; `false` means it was
    /// not and the host should retry later.
    fn archive_file(&self, file: &str, path: &Path) -> bool;

    /// Release resources before the host exits.
    fn shutdown(&self) {}
}
