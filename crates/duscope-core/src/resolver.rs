/// Scan-root self-correction.
///
/// A requested scan root that does not exist is walked upward, one parent at
/// a time, until an existing ancestor is found. Whether the corrected root is
/// acceptable is the caller's decision; [`ResolvedPath::was_corrected`] tells
/// it when to ask.
use crate::fs::{FilesystemClient, FsError};
use crate::model::size::shorten_tail;
use crate::model::RemotePath;
use thiserror::Error;
use tracing::{debug, info};

/// Paths longer than this are shortened in [`ResolvedPath::prompt`].
const PROMPT_PATH_WIDTH: usize = 50;

/// Outcome of resolving a requested scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// What the caller asked for.
    pub requested: RemotePath,
    /// The nearest existing path (the request itself when it exists).
    pub path: RemotePath,
    /// `true` if at least one parent substitution happened.
    pub was_corrected: bool,
}

impl ResolvedPath {
    /// Question to put to the operator when the path was corrected.
    pub fn prompt(&self) -> String {
        format!(
            "Couldn't find directory {}.\nDo you want to scan {}?",
            shorten_tail(&self.requested.to_string(), PROMPT_PATH_WIDTH),
            shorten_tail(&self.path.to_string(), PROMPT_PATH_WIDTH),
        )
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither the requested path nor any ancestor, up to and including the
    /// filesystem root, exists.
    #[error("path not found: {requested} (no existing ancestor)")]
    PathNotFound { requested: RemotePath },

    #[error("cannot check {path}: {source}")]
    Fs {
        path: RemotePath,
        #[source]
        source: FsError,
    },
}

/// Resolve `requested` to itself or its nearest existing ancestor.
pub fn resolve_path(
    client: &dyn FilesystemClient,
    requested: &RemotePath,
) -> Result<ResolvedPath, ResolveError> {
    let mut current = requested.clone();
    let mut was_corrected = false;

    loop {
        let exists = client.exists(&current).map_err(|source| ResolveError::Fs {
            path: current.clone(),
            source,
        })?;
        if exists {
            break;
        }
        debug!("{current} does not exist, trying its parent");
        current = match client.parent_of(&current) {
            Some(parent) => parent,
            None => {
                return Err(ResolveError::PathNotFound {
                    requested: requested.clone(),
                })
            }
        };
        was_corrected = true;
    }

    if was_corrected {
        info!("Scan root {requested} corrected to {current}");
    }

    Ok(ResolvedPath {
        requested: requested.clone(),
        path: current,
        was_corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    #[test]
    fn test_existing_path_is_unchanged() {
        let fs = MemoryFs::new();
        fs.add_dir("/a/b/c");
        let resolved = resolve_path(&fs, &RemotePath::parse("/a/b/c")).unwrap();
        assert_eq!(resolved.path.to_string(), "/a/b/c");
        assert!(!resolved.was_corrected);
    }

    #[test]
    fn test_missing_path_falls_back_to_nearest_ancestor() {
        let fs = MemoryFs::new();
        fs.add_dir("/a");
        let resolved = resolve_path(&fs, &RemotePath::parse("/a/b/c")).unwrap();
        assert_eq!(resolved.path.to_string(), "/a");
        assert!(resolved.was_corrected);
        assert_eq!(resolved.requested.to_string(), "/a/b/c");
    }

    #[test]
    fn test_correction_keeps_uri_authority() {
        let fs = MemoryFs::new();
        fs.add_dir("/user");
        let resolved = resolve_path(&fs, &RemotePath::parse("hdfs://nn:8020/user/gone")).unwrap();
        assert_eq!(resolved.path.to_string(), "hdfs://nn:8020/user");
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let fs = MemoryFs::without_root();
        let err = resolve_path(&fs, &RemotePath::parse("/a/b")).unwrap_err();
        assert!(matches!(err, ResolveError::PathNotFound { .. }));
    }

    #[test]
    fn test_prompt_shortens_long_paths() {
        let resolved = ResolvedPath {
            requested: RemotePath::parse(&format!("/{}", "d/".repeat(40))),
            path: RemotePath::parse("/"),
            was_corrected: true,
        };
        let prompt = resolved.prompt();
        assert!(prompt.starts_with("Couldn't find directory ..."));
        assert!(prompt.ends_with("Do you want to scan /?"));
    }
}
