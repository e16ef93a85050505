//! State store port (driven/secondary port)
//!
//! This module defines the interface for the durable mapping from local path
//! to tracked entry. The JSON file adapter lives in `fanout-store`.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (filesystem, serialization) and don't need domain-level classification.
//! - Mutating calls (`upsert`, `remove`) must persist durably before
//!   returning: the engine relies on the record surviving a crash that
//!   happens immediately after the call.
//! - The engine owns the store exclusively and serializes all mutation;
//!   implementations do not need cross-process locking.

use crate::domain::newtypes::EntryPath;
use crate::domain::tracked_entry::TrackedEntry;

/// Port trait for persistent tracked-entry storage
#[async_trait::async_trait]
pub trait IStateStore: Send + Sync {
    /// Retrieves the entry for a path, if tracked
    async fn get(&self, path: &EntryPath) -> anyhow::Result<Option<TrackedEntry>>;

    /// Replaces or inserts the record for `entry.path`, then persists the
    /// full mapping durably before returning
    async fn upsert(&self, entry: TrackedEntry) -> anyhow::Result<()>;

    /// Deletes the record for `path` and persists before returning
    ///
    /// Removing an untracked path is a no-op.
    async fn remove(&self, path: &EntryPath) -> anyhow::Result<()>;

    /// Snapshot of all tracked entries (used to compute the deletion set)
    async fn all(&self) -> anyhow::Result<Vec<TrackedEntry>>;
}
