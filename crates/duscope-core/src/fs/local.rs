/// Local-directory filesystem client.
///
/// Maps every remote path onto a directory on the local disk (`base`), so the
/// whole engine can be driven against a real filesystem: a mounted export of
/// the remote store, a fixture tree in tests, or a plain directory.
///
/// Trash follows the Hadoop layout: `<trash_root>/Current/<absolute path>`.
/// A name clash inside the trash gets a millisecond timestamp suffix, the way
/// HDFS checkpoints do. Without a trash root the trash is unsupported and the
/// deletion coordinator falls back to permanent removal.
use super::{ChildFailure, ChildStatus, EntryKind, FilesystemClient, FsError, Listing};
use crate::model::RemotePath;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the live trash directory below the trash root.
pub const TRASH_CURRENT: &str = "Current";

/// Filesystem client backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalFs {
    base: PathBuf,
    trash_root: Option<PathBuf>,
}

impl LocalFs {
    /// Serve remote `/` from `base`. No trash.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            trash_root: None,
        }
    }

    /// Enable trash, stored under `trash_root`.
    pub fn with_trash(mut self, trash_root: impl Into<PathBuf>) -> Self {
        self.trash_root = Some(trash_root.into());
        self
    }

    /// Local location of a remote path.
    pub fn local_path(&self, path: &RemotePath) -> PathBuf {
        path.segments()
            .fold(self.base.clone(), |acc, segment| acc.join(segment))
    }

    /// Where `path` lands when moved to the trash.
    fn trash_target(&self, trash_root: &Path, path: &RemotePath) -> PathBuf {
        let target = path
            .segments()
            .fold(trash_root.join(TRASH_CURRENT), |acc, segment| acc.join(segment));
        if !target.exists() {
            return target;
        }
        let stamp = chrono::Utc::now().timestamp_millis();
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(stamp.to_string());
        target.with_file_name(name)
    }
}

impl FilesystemClient for LocalFs {
    fn exists(&self, path: &RemotePath) -> Result<bool, FsError> {
        self.local_path(path)
            .try_exists()
            .map_err(|e| FsError::from_io(path, &e))
    }

    fn list_children(&self, path: &RemotePath) -> Result<Listing, FsError> {
        let dir = self.local_path(path);
        let reader = fs::read_dir(&dir).map_err(|e| FsError::from_io(path, &e))?;

        let mut listing = Listing::new();
        for entry in reader {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    // The entry has no name we could report; skip it.
                    warn!("Unreadable entry in {}: {err}", dir.display());
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            // symlink_metadata: never follow links out of the served tree.
            match fs::symlink_metadata(entry.path()) {
                Ok(meta) => {
                    let kind = if meta.is_dir() {
                        EntryKind::Directory
                    } else {
                        EntryKind::File
                    };
                    listing.push(Ok(ChildStatus {
                        name,
                        kind,
                        size: if meta.is_dir() { 0 } else { meta.len() },
                        modified: meta.modified().ok(),
                    }));
                }
                Err(err) => {
                    let kind = match entry.file_type() {
                        Ok(t) if t.is_dir() => EntryKind::Directory,
                        _ => EntryKind::File,
                    };
                    let child_path = path.join(&name).unwrap_or_else(|| path.clone());
                    listing.push(Err(ChildFailure {
                        error: FsError::from_io(&child_path, &err),
                        name,
                        kind,
                    }));
                }
            }
        }
        Ok(listing)
    }

    fn move_to_trash(&self, path: &RemotePath, kind: EntryKind) -> Result<bool, FsError> {
        let Some(trash_root) = &self.trash_root else {
            return Err(FsError::Unsupported(format!("no trash configured for {path}")));
        };

        let source = self.local_path(path);
        let target = self.trash_target(trash_root, path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(path, &e))?;
        }
        fs::rename(&source, &target).map_err(|e| FsError::from_io(path, &e))?;
        debug!(
            "Moved {} {} to {}",
            kind.noun(),
            source.display(),
            target.display()
        );
        Ok(true)
    }

    fn remove(&self, path: &RemotePath, kind: EntryKind) -> Result<bool, FsError> {
        let local = self.local_path(path);
        let result = match kind {
            EntryKind::Directory => fs::remove_dir_all(&local),
            EntryKind::File => fs::remove_file(&local),
        };
        result.map_err(|e| FsError::from_io(path, &e))?;
        Ok(true)
    }
}
