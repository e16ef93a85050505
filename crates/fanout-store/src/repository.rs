//! JSON file implementation of the state store port
//!
//! The whole mapping lives in one JSON document keyed by watch-root-relative
//! path. Every mutation rewrites the document atomically: serialize to a
//! sibling temp file, then rename over the target. A crash mid-write leaves
//! the previous document intact.
//!
//! Loading is tolerant: a missing file starts empty, a corrupt file is logged
//! and treated as empty (entries get re-created as uploads succeed), and
//! records in the older on-disk shape are normalized on the way in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use fanout_core::domain::newtypes::{ContentDigest, EntryPath, RemoteRef, TransportName};
use fanout_core::domain::tracked_entry::{EntryKind, TrackedEntry};
use fanout_core::ports::IStateStore;

/// Transport name assigned to refs stored in the legacy bare-string shape,
/// which predates per-transport ref maps.
const LEGACY_TRANSPORT_NAME: &str = "api";

// ============================================================================
// On-disk representation
// ============================================================================

/// One record as read from disk.
///
/// Accepts both the current shape (`content_hash` / `remote_refs` /
/// `last_synced_at`) and the legacy shape (`hash` / `ids`, where `ids` may be
/// a bare string instead of a map).
#[derive(Deserialize)]
struct StoredEntry {
    #[serde(alias = "hash")]
    content_hash: String,
    #[serde(default)]
    kind: Option<EntryKind>,
    #[serde(alias = "ids", default)]
    remote_refs: RefShape,
    #[serde(default)]
    last_synced_at: Option<DateTime<Utc>>,
}

/// Legacy records stored a single opaque ref string where newer records
/// store a map keyed by transport name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RefShape {
    Map(BTreeMap<String, String>),
    Single(String),
}

impl Default for RefShape {
    fn default() -> Self {
        RefShape::Map(BTreeMap::new())
    }
}

/// One record as written to disk (always the current shape).
#[derive(Serialize)]
struct WireEntry<'a> {
    kind: EntryKind,
    content_hash: &'a ContentDigest,
    remote_refs: &'a BTreeMap<TransportName, RemoteRef>,
    last_synced_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Converts a raw record into a domain entry, normalizing legacy shapes.
    fn into_tracked(self, path: EntryPath) -> anyhow::Result<TrackedEntry> {
        let content_hash = ContentDigest::new(self.content_hash)?;

        let kind = self.kind.unwrap_or(if content_hash.is_directory() {
            EntryKind::Folder
        } else {
            EntryKind::File
        });

        let mut remote_refs = BTreeMap::new();
        match self.remote_refs {
            RefShape::Map(map) => {
                for (transport, reference) in map {
                    remote_refs.insert(
                        TransportName::new(transport)?,
                        RemoteRef::new(reference)?,
                    );
                }
            }
            RefShape::Single(reference) => {
                remote_refs.insert(
                    TransportName::new(LEGACY_TRANSPORT_NAME.to_string())?,
                    RemoteRef::new(reference)?,
                );
            }
        }

        Ok(TrackedEntry {
            path,
            kind,
            content_hash,
            remote_refs,
            last_synced_at: self.last_synced_at.unwrap_or_else(Utc::now),
        })
    }
}

// ============================================================================
// JsonStateStore
// ============================================================================

/// State store backed by a single JSON file.
///
/// The engine owns the store exclusively and serializes mutation, so an
/// async `RwLock` around the in-memory map is sufficient.
pub struct JsonStateStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<EntryPath, TrackedEntry>>,
}

impl JsonStateStore {
    /// Opens the store at `path`, loading any existing document.
    ///
    /// A missing file starts the store empty. A file that cannot be parsed
    /// is logged and also starts the store empty rather than aborting:
    /// entries are rebuilt as uploads succeed, at the cost of re-sending
    /// content that was already remote.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => Self::parse(&path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no existing state file, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                return Err(e).context(format!("reading state file {}", path.display()));
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(path: &Path, bytes: &[u8]) -> BTreeMap<EntryPath, TrackedEntry> {
        let raw: BTreeMap<String, StoredEntry> = match serde_json::from_slice(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "state file is corrupt, starting with empty state"
                );
                return BTreeMap::new();
            }
        };

        let mut entries = BTreeMap::new();
        for (key, stored) in raw {
            let entry_path = match EntryPath::new(key.clone()) {
                Ok(p) => p,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping record with invalid path");
                    continue;
                }
            };
            match stored.into_tracked(entry_path.clone()) {
                Ok(entry) => {
                    entries.insert(entry_path, entry);
                }
                Err(e) => {
                    warn!(path = %key, error = %e, "skipping unreadable record");
                }
            }
        }
        debug!(count = entries.len(), "loaded state file");
        entries
    }

    /// Writes the full in-memory map to disk atomically.
    ///
    /// Serializes to `<path>.tmp` in the same directory, then renames over
    /// the target so readers never observe a partial document.
    async fn persist(&self, entries: &BTreeMap<EntryPath, TrackedEntry>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating state directory {}", parent.display()))?;
        }

        let wire: BTreeMap<&str, WireEntry<'_>> = entries
            .iter()
            .map(|(path, entry)| {
                (
                    path.as_str(),
                    WireEntry {
                        kind: entry.kind,
                        content_hash: &entry.content_hash,
                        remote_refs: &entry.remote_refs,
                        last_synced_at: entry.last_synced_at,
                    },
                )
            })
            .collect();
        let json = serde_json::to_vec_pretty(&wire)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing temp state file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing state file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IStateStore for JsonStateStore {
    async fn get(&self, path: &EntryPath) -> anyhow::Result<Option<TrackedEntry>> {
        Ok(self.entries.read().await.get(path).cloned())
    }

    async fn upsert(&self, entry: TrackedEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.path.clone(), entry);
        self.persist(&entries).await
    }

    async fn remove(&self, path: &EntryPath) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(path).is_none() {
            return Ok(());
        }
        self.persist(&entries).await
    }

    async fn all(&self) -> anyhow::Result<Vec<TrackedEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(s: &str) -> TransportName {
        TransportName::new(s.to_string()).unwrap()
    }

    fn entry(path: &str, hash: &str, refs: &[(&str, &str)]) -> TrackedEntry {
        let remote_refs = refs
            .iter()
            .map(|(t, r)| (name(t), RemoteRef::new(r.to_string()).unwrap()))
            .collect();
        TrackedEntry::new(
            EntryPath::new(path.to_string()).unwrap(),
            EntryKind::File,
            ContentDigest::new(hash.to_string()).unwrap(),
            remote_refs,
        )
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonStateStore::open(&path).await.unwrap();
        store
            .upsert(entry("notes.txt", "aaaa", &[("api", "f-1")]))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStateStore::open(&path).await.unwrap();
        let key = EntryPath::new("notes.txt".to_string()).unwrap();
        let loaded = reopened.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.content_hash.as_str(), "aaaa");
        assert_eq!(loaded.ref_for(&name("api")).unwrap().as_str(), "f-1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_record() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        store
            .upsert(entry("notes.txt", "aaaa", &[("api", "f-1")]))
            .await
            .unwrap();
        store
            .upsert(entry("notes.txt", "bbbb", &[("api", "f-2")]))
            .await
            .unwrap();

        let key = EntryPath::new("notes.txt".to_string()).unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.content_hash.as_str(), "bbbb");
        assert_eq!(loaded.ref_for(&name("api")).unwrap().as_str(), "f-2");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_untracked_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        let key = EntryPath::new("ghost.txt".to_string()).unwrap();
        store.remove(&key).await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonStateStore::open(&path).await.unwrap();
        store
            .upsert(entry("notes.txt", "aaaa", &[("api", "f-1")]))
            .await
            .unwrap();
        let key = EntryPath::new("notes.txt".to_string()).unwrap();
        store.remove(&key).await.unwrap();
        drop(store);

        let reopened = JsonStateStore::open(&path).await.unwrap();
        assert!(reopened.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let store = JsonStateStore::open(&path).await.unwrap();
        assert!(store.all().await.unwrap().is_empty());

        // The store stays usable and overwrites the corrupt document.
        store
            .upsert(entry("notes.txt", "aaaa", &[("api", "f-1")]))
            .await
            .unwrap();
        let reopened = JsonStateStore::open(&path).await.unwrap();
        assert_eq!(reopened.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_loads_legacy_map_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"docs/notes.txt": {"hash": "aaaa", "ids": {"api": "f-1", "ftp": "notes.txt"}}}"#,
        )
        .unwrap();

        let store = JsonStateStore::open(&path).await.unwrap();
        let key = EntryPath::new("docs/notes.txt".to_string()).unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.content_hash.as_str(), "aaaa");
        assert_eq!(loaded.ref_for(&name("api")).unwrap().as_str(), "f-1");
        assert_eq!(loaded.ref_for(&name("ftp")).unwrap().as_str(), "notes.txt");
        assert_eq!(loaded.kind, EntryKind::File);
    }

    #[tokio::test]
    async fn test_loads_legacy_bare_string_ref() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"notes.txt": {"hash": "aaaa", "ids": "f-9"}}"#).unwrap();

        let store = JsonStateStore::open(&path).await.unwrap();
        let key = EntryPath::new("notes.txt".to_string()).unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.ref_for(&name("api")).unwrap().as_str(), "f-9");
    }

    #[tokio::test]
    async fn test_legacy_dir_sentinel_becomes_folder_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"docs": {"hash": "dir", "ids": {"api": "d-1"}}}"#).unwrap();

        let store = JsonStateStore::open(&path).await.unwrap();
        let key = EntryPath::new("docs".to_string()).unwrap();
        let loaded = store.get(&key).await.unwrap().unwrap();
        assert_eq!(loaded.kind, EntryKind::Folder);
        assert!(loaded.content_hash.is_directory());
    }

    #[tokio::test]
    async fn test_skips_unreadable_records_keeps_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "good.txt": {"hash": "aaaa", "ids": {"api": "f-1"}},
                "/absolute/bad": {"hash": "bbbb", "ids": {"api": "f-2"}}
            }"#,
        )
        .unwrap();

        let store = JsonStateStore::open(&path).await.unwrap();
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path.as_str(), "good.txt");
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonStateStore::open(&path).await.unwrap();
        store
            .upsert(entry("notes.txt", "aaaa", &[("api", "f-1")]))
            .await
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
