//! Glob-style name filters applied at every level of the walk.
//!
//! Patterns match the entry's local name, not its full path.
//!
//! - **exclude**: an entry (file or directory) matching any exclude pattern
//!   is skipped together with its whole subtree.
//! - **include**: when at least one include pattern is given, a *file* is
//!   kept only if it matches one of them. Directories are still descended so
//!   that matching files below them stay reachable.
use crate::fs::EntryKind;
use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid name pattern {pattern:?}: {source}")]
pub struct FilterError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

/// Compiled include/exclude name patterns.
#[derive(Debug, Clone)]
pub struct NameFilter {
    include: GlobSet,
    exclude: GlobSet,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::none()
    }
}

impl NameFilter {
    /// A filter that keeps everything.
    pub fn none() -> Self {
        Self {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Compile include and exclude pattern lists.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let (include, include_patterns) = compile(include)?;
        let (exclude, exclude_patterns) = compile(exclude)?;
        Ok(Self {
            include,
            exclude,
            include_patterns,
            exclude_patterns,
        })
    }

    /// Exclude-only filter.
    pub fn excluding<E>(exclude: E) -> Result<Self, FilterError>
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self::new(std::iter::empty::<&str>(), exclude)
    }

    /// Include-only filter.
    pub fn including<I>(include: I) -> Result<Self, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::new(include, std::iter::empty::<&str>())
    }

    /// Whether an entry called `name` of `kind` stays in the tree.
    ///
    /// Include patterns never filter directories: a directory is dropped
    /// only by an exclude match, otherwise it is always descended.
    pub fn keeps(&self, name: &str, kind: EntryKind) -> bool {
        if self.exclude.is_match(name) {
            return false;
        }
        if kind.is_dir() || self.include_patterns.is_empty() {
            return true;
        }
        self.include.is_match(name)
    }

    /// `true` if no pattern was supplied.
    pub fn is_empty(&self) -> bool {
        self.include_patterns.is_empty() && self.exclude_patterns.is_empty()
    }

    /// Include patterns as given, in order.
    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }
}

fn compile<P>(patterns: P) -> Result<(GlobSet, Vec<String>), FilterError>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    let mut raw = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = Glob::new(pattern).map_err(|source| FilterError {
            pattern: pattern.to_string(),
            source,
        })?;
        builder.add(glob);
        raw.push(pattern.to_string());
    }
    let set = builder.build().map_err(|source| FilterError {
        pattern: raw.join(","),
        source,
    })?;
    Ok((set, raw))
}
