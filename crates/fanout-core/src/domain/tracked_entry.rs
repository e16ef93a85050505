//! TrackedEntry domain entity
//!
//! A `TrackedEntry` is the durable record linking a local path to its
//! last-confirmed content digest and the per-transport remote references
//! obtained for that content.
//!
//! ## Lifecycle
//!
//! ```text
//!   Untracked ──(upload success on ≥1 transport)──► Tracked(partial|full)
//!       ▲                                                  │
//!       │                                         content change: Dirty
//!       │                                                  │
//!       │        (all-transport delete success)            ▼
//!       └──────────── PendingDelete ◄──────────── local removal
//! ```
//!
//! There is no terminal failure state: any transport failure leaves the
//! entry in place and the path becomes a retry candidate on the next cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentDigest, EntryPath, RemoteRef, TransportName};

// ============================================================================
// EntryKind
// ============================================================================

/// Whether a tracked entry is a file or a folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A regular file with byte content
    #[default]
    File,
    /// A directory; carries the `"dir"` sentinel digest
    Folder,
}

impl EntryKind {
    /// Returns true for folder entries
    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, EntryKind::Folder)
    }
}

// ============================================================================
// TrackedEntry
// ============================================================================

/// Durable record for one local path that has been (at least partially)
/// synchronized to the configured transports.
///
/// ## Invariants
///
/// - `content_hash` reflects the content that produced the *current*
///   `remote_refs`; when local content changes the entry is dirty for every
///   transport until each transport's ref is refreshed.
/// - An entry normally holds at least one remote ref; the state store keys
///   entries by `path`, so an upsert replaces any previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    /// Watch-root-relative path, the unique key
    pub path: EntryPath,
    /// File or folder
    pub kind: EntryKind,
    /// Digest of the content behind the current refs (`"dir"` for folders)
    pub content_hash: ContentDigest,
    /// Per-transport remote references; a missing key means "not yet
    /// confirmed on that transport"
    pub remote_refs: BTreeMap<TransportName, RemoteRef>,
    /// When this record was last successfully persisted
    pub last_synced_at: DateTime<Utc>,
}

impl TrackedEntry {
    /// Creates a new entry with the given refs, stamped with the current time
    #[must_use]
    pub fn new(
        path: EntryPath,
        kind: EntryKind,
        content_hash: ContentDigest,
        remote_refs: BTreeMap<TransportName, RemoteRef>,
    ) -> Self {
        Self {
            path,
            kind,
            content_hash,
            remote_refs,
            last_synced_at: Utc::now(),
        }
    }

    /// Returns the ref held for a transport, if any
    #[must_use]
    pub fn ref_for(&self, transport: &TransportName) -> Option<&RemoteRef> {
        self.remote_refs.get(transport)
    }

    /// Returns true if the entry holds a ref for the transport
    #[must_use]
    pub fn has_ref(&self, transport: &TransportName) -> bool {
        self.remote_refs.contains_key(transport)
    }

    /// Returns true if the entry is clean for the given digest and every
    /// listed transport holds a ref (the "Unchanged" classification)
    #[must_use]
    pub fn is_clean(&self, digest: &ContentDigest, transports: &[&TransportName]) -> bool {
        self.content_hash == *digest && transports.iter().all(|t| self.has_ref(t))
    }

    /// Inserts or replaces the ref for a transport and refreshes the stamp
    pub fn set_ref(&mut self, transport: TransportName, reference: RemoteRef) {
        self.remote_refs.insert(transport, reference);
        self.last_synced_at = Utc::now();
    }

    /// Drops the ref for a transport (after a confirmed remote deletion)
    pub fn clear_ref(&mut self, transport: &TransportName) {
        self.remote_refs.remove(transport);
        self.last_synced_at = Utc::now();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TransportName {
        TransportName::new(s.to_string()).unwrap()
    }

    fn entry_with_refs(refs: &[(&str, &str)]) -> TrackedEntry {
        let remote_refs = refs
            .iter()
            .map(|(t, r)| (name(t), RemoteRef::new(r.to_string()).unwrap()))
            .collect();
        TrackedEntry::new(
            EntryPath::new("notes.txt".to_string()).unwrap(),
            EntryKind::File,
            ContentDigest::new("aa".repeat(32)).unwrap(),
            remote_refs,
        )
    }

    #[test]
    fn test_ref_lookup() {
        let entry = entry_with_refs(&[("api", "f-1")]);
        assert!(entry.has_ref(&name("api")));
        assert_eq!(entry.ref_for(&name("api")).unwrap().as_str(), "f-1");
        assert!(!entry.has_ref(&name("ftp")));
    }

    #[test]
    fn test_is_clean_requires_every_transport() {
        let entry = entry_with_refs(&[("api", "f-1")]);
        let digest = entry.content_hash.clone();
        let api = name("api");
        let ftp = name("ftp");

        assert!(entry.is_clean(&digest, &[&api]));
        assert!(!entry.is_clean(&digest, &[&api, &ftp]));
    }

    #[test]
    fn test_is_clean_requires_matching_digest() {
        let entry = entry_with_refs(&[("api", "f-1")]);
        let other = ContentDigest::new("bb".repeat(32)).unwrap();
        let api = name("api");

        assert!(!entry.is_clean(&other, &[&api]));
    }

    #[test]
    fn test_set_and_clear_ref() {
        let mut entry = entry_with_refs(&[("api", "f-1")]);
        entry.set_ref(name("ftp"), RemoteRef::new("notes.txt".to_string()).unwrap());
        assert_eq!(entry.remote_refs.len(), 2);

        entry.clear_ref(&name("api"));
        assert!(!entry.has_ref(&name("api")));
        assert!(entry.has_ref(&name("ftp")));
    }

    #[test]
    fn test_folder_entry_uses_sentinel() {
        let entry = TrackedEntry::new(
            EntryPath::new("docs".to_string()).unwrap(),
            EntryKind::Folder,
            ContentDigest::directory(),
            BTreeMap::new(),
        );
        assert!(entry.kind.is_folder());
        assert!(entry.content_hash.is_directory());
    }

    #[test]
    fn test_serde_roundtrip() {
        let entry = entry_with_refs(&[("api", "f-1"), ("ftp", "notes.txt")]);
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: TrackedEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, parsed);
    }
}
