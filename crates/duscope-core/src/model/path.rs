/// Absolute paths inside a remote hierarchical store.
///
/// Remote stores are addressed by URI-like strings such as
/// `hdfs://namenode:8020/user/alice/logs` or plain `/user/alice/logs`.
/// `RemotePath` keeps the `scheme://authority` prefix apart from the
/// slash-separated path so that parent/child arithmetic never touches the
/// authority part.
use std::fmt;

/// A normalised absolute path in the remote store.
///
/// The path part always starts with `/`, never ends with one (except for the
/// filesystem root itself) and contains no empty, `.` or `..` segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePath {
    /// `scheme://authority` prefix. Empty for plain paths.
    prefix: String,
    /// Normalised path part.
    path: String,
}

impl RemotePath {
    /// Parse and normalise a path or URI.
    ///
    /// Relative inputs are treated as relative to the filesystem root.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (prefix, raw_path) = match input.find("://") {
            Some(scheme_end) => {
                let after = &input[scheme_end + 3..];
                match after.find('/') {
                    Some(slash) => (
                        input[..scheme_end + 3 + slash].to_string(),
                        &after[slash..],
                    ),
                    None => (input.to_string(), "/"),
                }
            }
            None => (String::new(), input),
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        Self {
            prefix,
            path: format!("/{}", segments.join("/")),
        }
    }

    /// `true` if this is the filesystem root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// The containing directory, or `None` at the filesystem root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let cut = self.path.rfind('/').unwrap_or(0);
        let parent = if cut == 0 { "/" } else { &self.path[..cut] };
        Some(Self {
            prefix: self.prefix.clone(),
            path: parent.to_string(),
        })
    }

    /// `true` if `name` can name a single child: non-empty, not `.` or
    /// `..`, and free of `/`.
    pub fn is_segment(name: &str) -> bool {
        !name.is_empty() && name != "." && name != ".." && !name.contains('/')
    }

    /// Append a single child segment.
    ///
    /// Returns `None` if `name` is not a single segment (see
    /// [`RemotePath::is_segment`]); such names are refused, never normalised.
    pub fn join(&self, name: &str) -> Option<Self> {
        if !Self::is_segment(name) {
            return None;
        }
        let path = if self.is_root() {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        };
        Some(Self {
            prefix: self.prefix.clone(),
            path,
        })
    }

    /// Last path segment, or `None` for the filesystem root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.path.rsplit('/').next()
        }
    }

    /// Path segments below the root, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// The path part without the `scheme://authority` prefix.
    #[inline]
    pub fn as_path_str(&self) -> &str {
        &self.path
    }

    /// The `scheme://authority` prefix, empty for plain paths.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.path)
    }
}

impl From<&str> for RemotePath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
