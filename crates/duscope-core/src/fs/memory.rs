/// In-memory filesystem client with failure injection.
///
/// Holds a flat map of absolute paths to entries. Failures can be injected
/// per path (unlistable directories, unstattable children) or per operation
/// (trash unsupported or failing, remove failing), and every call is
/// recorded so tests can assert exactly which filesystem operations ran.
use super::{ChildFailure, ChildStatus, EntryKind, FilesystemClient, FsError, Listing};
use crate::model::RemotePath;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// A recorded client call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsCall {
    Exists(String),
    List(String),
    Trash(String),
    Remove(String),
}

/// How `move_to_trash` behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrashMode {
    /// Entries move to the trash.
    #[default]
    Supported,
    /// `move_to_trash` returns `Ok(false)`.
    Unavailable,
    /// `move_to_trash` returns an error.
    Failing,
}

#[derive(Clone, Debug)]
struct MemEntry {
    kind: EntryKind,
    size: u64,
}

type ListHook = Box<dyn Fn(&RemotePath) + Send + Sync>;

#[derive(Default)]
struct Inner {
    entries: BTreeMap<String, MemEntry>,
    trashed: BTreeSet<String>,
    unlistable: BTreeSet<String>,
    unstattable: BTreeSet<String>,
    trash_mode: TrashMode,
    remove_fails: bool,
    calls: Vec<FsCall>,
}

/// In-memory [`FilesystemClient`].
pub struct MemoryFs {
    inner: Mutex<Inner>,
    list_hook: Option<ListHook>,
    list_delay: Option<Duration>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// An empty store holding only `/`.
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.entries.insert(
            "/".to_string(),
            MemEntry {
                kind: EntryKind::Directory,
                size: 0,
            },
        );
        Self {
            inner: Mutex::new(inner),
            list_hook: None,
            list_delay: None,
        }
    }

    /// A store without even a root directory.
    pub fn without_root() -> Self {
        let fs = Self::new();
        fs.inner.lock().entries.clear();
        fs
    }

    /// Add a directory and any missing ancestors.
    pub fn add_dir(&self, path: &str) -> &Self {
        let path = RemotePath::parse(path);
        let mut inner = self.inner.lock();
        Self::insert_ancestors(&mut inner, &path);
        inner.entries.insert(
            path.as_path_str().to_string(),
            MemEntry {
                kind: EntryKind::Directory,
                size: 0,
            },
        );
        self
    }

    /// Add a file of `size` bytes and any missing ancestors.
    pub fn add_file(&self, path: &str, size: u64) -> &Self {
        let path = RemotePath::parse(path);
        let mut inner = self.inner.lock();
        Self::insert_ancestors(&mut inner, &path);
        inner.entries.insert(
            path.as_path_str().to_string(),
            MemEntry {
                kind: EntryKind::File,
                size,
            },
        );
        self
    }

    fn insert_ancestors(inner: &mut Inner, path: &RemotePath) {
        let mut current = path.parent();
        while let Some(dir) = current {
            inner
                .entries
                .entry(dir.as_path_str().to_string())
                .or_insert(MemEntry {
                    kind: EntryKind::Directory,
                    size: 0,
                });
            current = dir.parent();
        }
    }

    /// Listing `path` fails with `PermissionDenied`.
    pub fn deny_listing(&self, path: &str) -> &Self {
        let key = RemotePath::parse(path).as_path_str().to_string();
        self.inner.lock().unlistable.insert(key);
        self
    }

    /// `path` shows up in its parent's listing as a status failure.
    pub fn deny_status(&self, path: &str) -> &Self {
        let key = RemotePath::parse(path).as_path_str().to_string();
        self.inner.lock().unstattable.insert(key);
        self
    }

    pub fn set_trash_mode(&self, mode: TrashMode) -> &Self {
        self.inner.lock().trash_mode = mode;
        self
    }

    pub fn set_remove_fails(&self, fails: bool) -> &Self {
        self.inner.lock().remove_fails = fails;
        self
    }

    /// Run `hook` at the start of every listing call.
    pub fn with_list_hook(mut self, hook: impl Fn(&RemotePath) + Send + Sync + 'static) -> Self {
        self.list_hook = Some(Box::new(hook));
        self
    }

    /// Sleep this long in every listing call, to emulate a slow remote.
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<FsCall> {
        self.inner.lock().calls.clone()
    }

    /// Calls that mutate the store (trash or remove).
    pub fn mutating_calls(&self) -> Vec<FsCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, FsCall::Trash(_) | FsCall::Remove(_)))
            .collect()
    }

    /// Whether `path` currently exists, without recording a call.
    pub fn contains(&self, path: &str) -> bool {
        let key = RemotePath::parse(path).as_path_str().to_string();
        self.inner.lock().entries.contains_key(&key)
    }

    /// Whether `path` was moved to the trash.
    pub fn is_trashed(&self, path: &str) -> bool {
        let key = RemotePath::parse(path).as_path_str().to_string();
        self.inner.lock().trashed.contains(&key)
    }

    /// Remove `key` and everything below it. Returns `false` if absent.
    fn detach(inner: &mut Inner, key: &str) -> bool {
        if inner.entries.remove(key).is_none() {
            return false;
        }
        let prefix = if key == "/" {
            "/".to_string()
        } else {
            format!("{key}/")
        };
        inner.entries.retain(|k, _| !k.starts_with(&prefix));
        true
    }
}

impl FilesystemClient for MemoryFs {
    fn exists(&self, path: &RemotePath) -> Result<bool, FsError> {
        let key = path.as_path_str().to_string();
        let mut inner = self.inner.lock();
        inner.calls.push(FsCall::Exists(key.clone()));
        Ok(inner.entries.contains_key(&key))
    }

    fn list_children(&self, path: &RemotePath) -> Result<Listing, FsError> {
        if let Some(hook) = &self.list_hook {
            hook(path);
        }
        if let Some(delay) = self.list_delay {
            std::thread::sleep(delay);
        }

        let key = path.as_path_str().to_string();
        let mut inner = self.inner.lock();
        inner.calls.push(FsCall::List(key.clone()));

        if inner.unlistable.contains(&key) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        match inner.entries.get(&key) {
            Some(entry) if entry.kind.is_dir() => {}
            Some(_) => {
                return Err(FsError::Io {
                    path: path.to_string(),
                    message: "not a directory".to_string(),
                })
            }
            None => return Err(FsError::NotFound(path.to_string())),
        }

        let listing = inner
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .filter_map(|(k, entry)| {
                let child = RemotePath::parse(k);
                if child.parent().as_ref().map(RemotePath::as_path_str) != Some(key.as_str()) {
                    return None;
                }
                let name = child.file_name()?.to_string();
                if inner.unstattable.contains(k) {
                    return Some(Err(ChildFailure {
                        name,
                        kind: entry.kind,
                        error: FsError::PermissionDenied(child.to_string()),
                    }));
                }
                Some(Ok(ChildStatus {
                    name,
                    kind: entry.kind,
                    size: entry.size,
                    modified: None,
                }))
            })
            .collect();
        Ok(listing)
    }

    fn move_to_trash(&self, path: &RemotePath, _kind: EntryKind) -> Result<bool, FsError> {
        let key = path.as_path_str().to_string();
        let mut inner = self.inner.lock();
        inner.calls.push(FsCall::Trash(key.clone()));
        match inner.trash_mode {
            TrashMode::Unavailable => Ok(false),
            TrashMode::Failing => Err(FsError::Io {
                path: path.to_string(),
                message: "trash checkpoint failed".to_string(),
            }),
            TrashMode::Supported => {
                if !Self::detach(&mut inner, &key) {
                    return Err(FsError::NotFound(path.to_string()));
                }
                inner.trashed.insert(key);
                Ok(true)
            }
        }
    }

    fn remove(&self, path: &RemotePath, _kind: EntryKind) -> Result<bool, FsError> {
        let key = path.as_path_str().to_string();
        let mut inner = self.inner.lock();
        inner.calls.push(FsCall::Remove(key.clone()));
        if inner.remove_fails {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        Ok(Self::detach(&mut inner, &key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_ancestors() {
        let fs = MemoryFs::new();
        fs.add_file("/a/b/c.txt", 4);
        assert!(fs.contains("/a"));
        assert!(fs.contains("/a/b"));
        let listing = fs.list_children(&RemotePath::parse("/a")).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].as_ref().unwrap().name, "b");
    }

    #[test]
    fn test_injected_failures() {
        let fs = MemoryFs::new();
        fs.add_file("/a/x", 1).add_dir("/a/locked").deny_listing("/a/locked");
        fs.deny_status("/a/x");

        let listing = fs.list_children(&RemotePath::parse("/a")).unwrap();
        assert!(listing.iter().any(|r| r.is_err()));
        assert!(matches!(
            fs.list_children(&RemotePath::parse("/a/locked")),
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_trash_and_remove_record_calls() {
        let fs = MemoryFs::new();
        fs.add_file("/a/x", 1).add_file("/a/y", 2);
        assert!(fs
            .move_to_trash(&RemotePath::parse("/a/x"), EntryKind::File)
            .unwrap());
        assert!(fs.is_trashed("/a/x"));
        assert!(fs.remove(&RemotePath::parse("/a"), EntryKind::Directory).unwrap());
        assert!(!fs.contains("/a/y"));
        assert_eq!(
            fs.mutating_calls(),
            vec![FsCall::Trash("/a/x".into()), FsCall::Remove("/a".into())]
        );
    }
}
