/// Filesystem client seam.
///
/// The scanner, resolver and deletion coordinator never talk to a concrete
/// store; they consume the [`FilesystemClient`] capabilities below. A real
/// deployment plugs in a client for its distributed filesystem. Two
/// implementations ship with the crate:
///
/// - [`LocalFs`]: maps remote paths onto a local directory, with a
///   Hadoop-style trash folder.
/// - [`MemoryFs`]: in-memory store with failure injection, for tests and
///   embedders.
///
/// Timeouts and retries are the client's business; every failure surfaces
/// here as a typed [`FsError`].
pub mod local;
pub mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;

use crate::model::RemotePath;
use std::time::SystemTime;
use thiserror::Error;

/// File or directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    #[inline]
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Lowercase noun used in prompts and logs.
    pub fn noun(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildStatus {
    pub name: String,
    pub kind: EntryKind,
    /// Byte size for files. Ignored for directories.
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// A child the listing returned but whose status could not be read.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildFailure {
    pub name: String,
    pub kind: EntryKind,
    pub error: FsError,
}

/// A listing: one result per child, in the order the store returned them.
pub type Listing = Vec<Result<ChildStatus, ChildFailure>>;

/// Failures reported by a filesystem client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The operation is not available on this store (e.g. no trash).
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl FsError {
    /// Map a `std::io::Error` for `path` onto the client taxonomy.
    pub fn from_io(path: &RemotePath, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            std::io::ErrorKind::Unsupported => FsError::Unsupported(path.to_string()),
            _ => FsError::Io {
                path: path.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Capabilities consumed from a hierarchical remote store.
///
/// Implementations must be shareable across the session thread and the
/// background scan/delete workers.
pub trait FilesystemClient: Send + Sync {
    /// Whether `path` exists.
    fn exists(&self, path: &RemotePath) -> Result<bool, FsError>;

    /// List the direct children of the directory at `path`.
    ///
    /// An `Err` means the directory itself could not be listed; per-child
    /// status failures are reported inside the listing.
    fn list_children(&self, path: &RemotePath) -> Result<Listing, FsError>;

    /// The containing directory, or `None` at the filesystem root.
    fn parent_of(&self, path: &RemotePath) -> Option<RemotePath> {
        path.parent()
    }

    /// Move `path` to the store's trash.
    ///
    /// `Ok(false)` and `Err(_)` both mean the trash is not available for
    /// this entry.
    fn move_to_trash(&self, path: &RemotePath, kind: EntryKind) -> Result<bool, FsError>;

    /// Permanently remove `path` (recursively for directories).
    ///
    /// Treated as atomic: callers do not attempt recovery from a partially
    /// removed directory.
    fn remove(&self, path: &RemotePath, kind: EntryKind) -> Result<bool, FsError>;
}
