//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// EntryPath
// ============================================================================

/// A validated watch-root-relative path, the unique key of a tracked entry.
///
/// EntryPath ensures the path is:
/// - Relative (no leading `/`)
/// - `/`-separated regardless of platform
/// - Normalized (no `.` or `..` components, no empty components)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryPath(String);

impl EntryPath {
    /// Create a new EntryPath from a `/`-separated relative string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// or contains `.`, `..`, or empty components.
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Err(DomainError::InvalidPath(
                "Entry path cannot be empty".to_string(),
            ));
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Entry path must be relative: {path}"
            )));
        }
        for component in path.split('/') {
            if component.is_empty() {
                return Err(DomainError::InvalidPath(format!(
                    "Entry path contains empty component: {path}"
                )));
            }
            if component == "." || component == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "Entry path contains invalid traversal: {path}"
                )));
            }
        }
        Ok(Self(path))
    }

    /// Create an EntryPath from a filesystem path relative to the watch root
    ///
    /// Components are joined with `/` regardless of the platform separator.
    ///
    /// # Errors
    /// Returns error if the path is absolute, empty, or non-normalized.
    pub fn from_relative(path: &Path) -> Result<Self, DomainError> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(c) => parts.push(c.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "Path is not a normalized relative path: {}",
                        path.display()
                    )));
                }
            }
        }
        Self::new(parts.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final component (file or folder name)
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The parent path, or `None` for a top-level entry
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Number of components in the path
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// True if this path is `ancestor` itself or lies anywhere beneath it
    ///
    /// Component-aware: `docs2/x` is not under `docs`.
    #[must_use]
    pub fn starts_with(&self, ancestor: &EntryPath) -> bool {
        self.0 == ancestor.0 || self.0.starts_with(&format!("{}/", ancestor.0))
    }

    /// Resolve this entry path below a filesystem root
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for component in self.0.split('/') {
            out.push(component);
        }
        out
    }
}

impl Display for EntryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for EntryPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntryPath> for String {
    fn from(path: EntryPath) -> Self {
        path.0
    }
}

// ============================================================================
// TransportName
// ============================================================================

/// Identifier of a configured transport (e.g. `"api"`, `"ftp-backup"`)
///
/// Used as the key of the per-transport remote ref mapping, so it must be
/// stable across runs and restricted to a safe character set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransportName(String);

impl TransportName {
    /// Create a new TransportName
    ///
    /// # Errors
    /// Returns error if the name is empty or contains characters other than
    /// alphanumerics, `-` and `_`.
    pub fn new(name: String) -> Result<Self, DomainError> {
        if name.is_empty() {
            return Err(DomainError::InvalidTransportName(
                "Transport name cannot be empty".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidTransportName(format!(
                "Transport name contains invalid characters: {name}"
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransportName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransportName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for TransportName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TransportName> for String {
    fn from(name: TransportName) -> Self {
        name.0
    }
}

// ============================================================================
// RemoteRef
// ============================================================================

/// An opaque transport-specific identifier for remotely stored content
///
/// For an object-storage API this is typically a server-assigned ID; for a
/// path-addressed destination it is the remote path. The engine never
/// interprets the contents, only that it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteRef(String);

impl RemoteRef {
    /// Create a new RemoteRef
    ///
    /// # Errors
    /// Returns error if the ref is empty.
    pub fn new(reference: String) -> Result<Self, DomainError> {
        if reference.is_empty() {
            return Err(DomainError::InvalidRemoteRef(
                "Remote ref cannot be empty".to_string(),
            ));
        }
        Ok(Self(reference))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteRef {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteRef> for String {
    fn from(reference: RemoteRef) -> Self {
        reference.0
    }
}

// ============================================================================
// ContentDigest
// ============================================================================

/// Content fingerprint of a tracked entry
///
/// For files this is the hex-encoded SHA-256 of the byte content; folders
/// carry the sentinel value `"dir"` since they have no content of their own.
/// This is a change-detection checksum, not a security primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Sentinel digest used for folder entries
    const DIRECTORY_SENTINEL: &'static str = "dir";

    /// Create a new ContentDigest
    ///
    /// # Errors
    /// Returns error if the digest is empty.
    pub fn new(digest: String) -> Result<Self, DomainError> {
        if digest.is_empty() {
            return Err(DomainError::InvalidDigest(
                "Digest cannot be empty".to_string(),
            ));
        }
        Ok(Self(digest))
    }

    /// The sentinel digest for folders
    #[must_use]
    pub fn directory() -> Self {
        Self(Self::DIRECTORY_SENTINEL.to_string())
    }

    /// Returns true if this is the folder sentinel
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.0 == Self::DIRECTORY_SENTINEL
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod entry_path_tests {
        use super::*;

        #[test]
        fn test_new_valid() {
            let path = EntryPath::new("docs/report.pdf".to_string()).unwrap();
            assert_eq!(path.as_str(), "docs/report.pdf");
        }

        #[test]
        fn test_empty_fails() {
            assert!(EntryPath::new(String::new()).is_err());
        }

        #[test]
        fn test_absolute_fails() {
            assert!(EntryPath::new("/etc/passwd".to_string()).is_err());
        }

        #[test]
        fn test_traversal_fails() {
            assert!(EntryPath::new("a/../b".to_string()).is_err());
            assert!(EntryPath::new("./a".to_string()).is_err());
        }

        #[test]
        fn test_double_slash_fails() {
            assert!(EntryPath::new("a//b".to_string()).is_err());
        }

        #[test]
        fn test_from_relative() {
            let path = EntryPath::from_relative(Path::new("a/b/c.txt")).unwrap();
            assert_eq!(path.as_str(), "a/b/c.txt");
        }

        #[test]
        fn test_from_relative_absolute_fails() {
            assert!(EntryPath::from_relative(Path::new("/a/b")).is_err());
        }

        #[test]
        fn test_name() {
            let path = EntryPath::new("a/b/c.txt".to_string()).unwrap();
            assert_eq!(path.name(), "c.txt");

            let top = EntryPath::new("file.txt".to_string()).unwrap();
            assert_eq!(top.name(), "file.txt");
        }

        #[test]
        fn test_parent() {
            let path = EntryPath::new("a/b/c.txt".to_string()).unwrap();
            let parent = path.parent().unwrap();
            assert_eq!(parent.as_str(), "a/b");

            let grandparent = parent.parent().unwrap();
            assert_eq!(grandparent.as_str(), "a");
            assert!(grandparent.parent().is_none());
        }

        #[test]
        fn test_depth() {
            assert_eq!(EntryPath::new("a".to_string()).unwrap().depth(), 1);
            assert_eq!(EntryPath::new("a/b/c".to_string()).unwrap().depth(), 3);
        }

        #[test]
        fn test_starts_with() {
            let docs = EntryPath::new("docs".to_string()).unwrap();
            let nested = EntryPath::new("docs/sub/a.txt".to_string()).unwrap();
            let sibling = EntryPath::new("docs2/a.txt".to_string()).unwrap();

            assert!(docs.starts_with(&docs));
            assert!(nested.starts_with(&docs));
            assert!(!sibling.starts_with(&docs));
            assert!(!docs.starts_with(&nested));
        }

        #[test]
        fn test_resolve() {
            let path = EntryPath::new("a/b.txt".to_string()).unwrap();
            let abs = path.resolve(Path::new("/watch/root"));
            assert_eq!(abs, PathBuf::from("/watch/root/a/b.txt"));
        }

        #[test]
        fn test_ordering_is_lexicographic() {
            let a = EntryPath::new("a".to_string()).unwrap();
            let b = EntryPath::new("a/b".to_string()).unwrap();
            assert!(a < b);
        }

        #[test]
        fn test_serde_roundtrip() {
            let path = EntryPath::new("x/y.bin".to_string()).unwrap();
            let json = serde_json::to_string(&path).unwrap();
            let parsed: EntryPath = serde_json::from_str(&json).unwrap();
            assert_eq!(path, parsed);
        }
    }

    mod transport_name_tests {
        use super::*;

        #[test]
        fn test_valid_names() {
            assert!(TransportName::new("api".to_string()).is_ok());
            assert!(TransportName::new("ftp-backup_2".to_string()).is_ok());
        }

        #[test]
        fn test_empty_fails() {
            assert!(TransportName::new(String::new()).is_err());
        }

        #[test]
        fn test_invalid_chars_fail() {
            assert!(TransportName::new("has space".to_string()).is_err());
            assert!(TransportName::new("slash/name".to_string()).is_err());
        }
    }

    mod remote_ref_tests {
        use super::*;

        #[test]
        fn test_valid_ref() {
            let r = RemoteRef::new("f-83c1".to_string()).unwrap();
            assert_eq!(r.as_str(), "f-83c1");
        }

        #[test]
        fn test_path_style_ref() {
            // Path-addressed transports use the remote path as the ref.
            let r = RemoteRef::new("backups/notes.txt".to_string()).unwrap();
            assert_eq!(r.as_str(), "backups/notes.txt");
        }

        #[test]
        fn test_empty_fails() {
            assert!(RemoteRef::new(String::new()).is_err());
        }
    }

    mod content_digest_tests {
        use super::*;

        #[test]
        fn test_valid_digest() {
            let d = ContentDigest::new("ab".repeat(32)).unwrap();
            assert!(!d.is_directory());
        }

        #[test]
        fn test_directory_sentinel() {
            let d = ContentDigest::directory();
            assert_eq!(d.as_str(), "dir");
            assert!(d.is_directory());
        }

        #[test]
        fn test_empty_fails() {
            assert!(ContentDigest::new(String::new()).is_err());
        }

        #[test]
        fn test_serde_roundtrip() {
            let d = ContentDigest::directory();
            let json = serde_json::to_string(&d).unwrap();
            let parsed: ContentDigest = serde_json::from_str(&json).unwrap();
            assert_eq!(d, parsed);
        }
    }
}
