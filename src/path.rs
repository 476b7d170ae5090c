//! Filesystem path to IMAP folder name resolution
//!
//! A dispatcher path like `/projects/notes` maps to the folder
//! `<root>/projects/notes` on the server. Resolution is total: any
//! syntactically valid path resolves; whether the folder exists is the
//! classifier's concern. Quoting and escaping of the name on the wire
//! is left to the IMAP command serializer.

use std::fmt;

/// The protocol-syntax form of a filesystem path: the root prefix
/// followed by the path's segments, joined with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedName(String);

impl ResolvedName {
    /// The folder name as sent to the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of `/`-separated segments, root prefix included. A
    /// direct child of this folder has `depth() + 1` segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps dispatcher paths into the server's folder namespace.
///
/// Pure and infallible; no I/O.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: String,
}

impl PathResolver {
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a dispatcher path (leading separator, arbitrary depth)
    /// into the root-prefixed folder name. Empty segments collapse, so
    /// `//a///b/` and `/a/b` resolve identically; `/` resolves to the
    /// bare root prefix.
    #[must_use]
    pub fn resolve(&self, path: &str) -> ResolvedName {
        let mut name = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            name.push('/');
            name.push_str(segment);
        }
        ResolvedName(name)
    }
}
