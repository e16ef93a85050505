//! Reconciliation engine
//!
//! One cycle walks the local tree in preorder (parents before children),
//! classifies every entry against the state store, dispatches the needed
//! operations to each configured transport independently, and finishes with
//! a deletion pass for tracked paths that no longer exist locally.
//!
//! ## Guarantees
//!
//! - At-least-once: a remote operation may be repeated after a crash, but a
//!   confirmed ref is never forgotten (the store persists before the engine
//!   moves on).
//! - Partial-failure tolerance: one transport failing never blocks another,
//!   and never discards refs the failing transport already confirmed unless
//!   the content itself changed.
//! - Conservative deletion: a tracked record is removed only once every
//!   configured transport has confirmed the remote deletion.
//!
//! There is exactly one cycle running at a time; the engine is the sole
//! writer of the state store.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use fanout_core::domain::newtypes::{ContentDigest, EntryPath, RemoteRef, TransportName};
use fanout_core::domain::tracked_entry::{EntryKind, TrackedEntry};
use fanout_core::ports::{IStateStore, ITransport, TransportRegistry};

use crate::fingerprint;

// ============================================================================
// CycleReport
// ============================================================================

/// Outcome summary of one reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Successful file uploads (counted per transport)
    pub files_uploaded: u64,
    /// Successful remote folder creations (counted per transport)
    pub folders_created: u64,
    /// Tracked records fully released after remote deletion
    pub deleted: u64,
    /// Entries skipped as unchanged, oversized, or not applicable
    pub skipped: u64,
    /// Failed per-transport operations; each becomes a retry candidate
    pub errors: u64,
    /// True if the cycle stopped early on a shutdown request
    pub cancelled: bool,
    /// Wall-clock duration of the cycle
    pub duration: Duration,
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} folders created, {} deleted, {} skipped, {} errors in {:.1}s{}",
            self.files_uploaded,
            self.folders_created,
            self.deleted,
            self.skipped,
            self.errors,
            self.duration.as_secs_f64(),
            if self.cancelled { " (cancelled)" } else { "" },
        )
    }
}

// ============================================================================
// Local enumeration
// ============================================================================

/// One entry found under the watch root during enumeration
#[derive(Debug, Clone)]
struct LocalItem {
    path: EntryPath,
    abs: PathBuf,
    kind: EntryKind,
    size: u64,
}

// ============================================================================
// ReconcileEngine
// ============================================================================

/// Drives reconciliation cycles against the configured transports
pub struct ReconcileEngine {
    registry: Arc<TransportRegistry>,
    store: Arc<dyn IStateStore>,
    watch_root: PathBuf,
    max_file_size: u64,
    /// Absolute path of the state file, excluded from enumeration in case it
    /// lives under the watch root
    state_file: PathBuf,
    cancel: CancellationToken,
}

impl ReconcileEngine {
    /// Creates an engine over the given transports, store and watch root
    ///
    /// Both paths are canonicalized so the state-file exclusion holds no
    /// matter how the configuration spells them.
    pub fn new(
        registry: Arc<TransportRegistry>,
        store: Arc<dyn IStateStore>,
        watch_root: PathBuf,
        max_file_size: u64,
        state_file: PathBuf,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            store,
            watch_root: canonicalized(&watch_root),
            max_file_size,
            state_file: canonicalized(&state_file),
            cancel,
        }
    }

    // ========================================================================
    // Cycle driver
    // ========================================================================

    /// Runs one full reconciliation cycle
    ///
    /// Storage failures abort the cycle (the store is the source of truth
    /// and must stay consistent); transport failures never do.
    #[instrument(skip(self), fields(root = %self.watch_root.display()))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let mut report = CycleReport::default();

        let (items, skipped) = self.enumerate().await?;
        debug!(count = items.len(), "Enumerated local tree");

        for item in &items {
            if self.cancel.is_cancelled() {
                info!("Cycle cancelled during upload pass");
                report.cancelled = true;
                break;
            }
            self.process_item(item, &mut report).await?;
        }

        if !report.cancelled {
            let local: BTreeSet<&EntryPath> = items.iter().map(|i| &i.path).collect();
            self.process_removals(&local, &skipped, &mut report).await?;
        }

        report.duration = started.elapsed();
        info!(%report, "Cycle complete");
        Ok(report)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Walks the watch root in preorder with sorted siblings
    ///
    /// The ordering guarantees a folder is yielded before anything inside
    /// it, so parent refs are always in the store before a child needs them.
    ///
    /// Only the watch root itself is load-bearing: a subdirectory that
    /// cannot be read (permissions, concurrent removal) is logged, reported
    /// in the skipped list, and left for the next cycle. Its tracked
    /// descendants must not enter the deletion set, since their local
    /// presence is unknown this cycle.
    async fn enumerate(&self) -> Result<(Vec<LocalItem>, Vec<EntryPath>)> {
        let mut items = Vec::new();
        let mut skipped = Vec::new();
        self.collect(self.watch_root.clone(), None, &mut items, &mut skipped)
            .await?;
        Ok((items, skipped))
    }

    fn collect<'a>(
        &'a self,
        dir: PathBuf,
        rel: Option<EntryPath>,
        out: &'a mut Vec<LocalItem>,
        skipped: &'a mut Vec<EntryPath>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    let Some(path) = &rel else {
                        return Err(e)
                            .with_context(|| format!("reading watch root {}", dir.display()));
                    };
                    warn!(path = %path, error = %e, "Cannot read directory, skipping subtree");
                    skipped.push(path.clone());
                    return Ok(());
                }
            };

            let mut entries = Vec::new();
            loop {
                match read_dir.next_entry().await {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => break,
                    Err(e) => {
                        let Some(path) = &rel else {
                            return Err(e)
                                .with_context(|| format!("reading watch root {}", dir.display()));
                        };
                        warn!(path = %path, error = %e, "Directory listing failed, skipping subtree");
                        skipped.push(path.clone());
                        return Ok(());
                    }
                }
            }
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                let name = entry.file_name().to_string_lossy().into_owned();
                let abs = entry.path();

                if self.is_ignored(&name, &abs) {
                    debug!(path = %abs.display(), "Ignoring entry");
                    continue;
                }

                let path = match &rel {
                    Some(parent) => EntryPath::new(format!("{}/{name}", parent.as_str()))?,
                    None => EntryPath::new(name)?,
                };

                // The entry can vanish between readdir and stat; pick it up
                // next cycle.
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(e) => {
                        warn!(path = %abs.display(), error = %e, "Cannot stat entry, skipping");
                        continue;
                    }
                };

                if meta.is_dir() {
                    out.push(LocalItem {
                        path: path.clone(),
                        abs: abs.clone(),
                        kind: EntryKind::Folder,
                        size: 0,
                    });
                    self.collect(abs, Some(path), out, skipped).await?;
                } else if meta.is_file() {
                    out.push(LocalItem {
                        path,
                        abs,
                        kind: EntryKind::File,
                        size: meta.len(),
                    });
                }
                // Symlinks and special files are not mirrored.
            }

            Ok(())
        })
    }

    /// Ignore policy: editor/backup artifacts and the engine's own state file
    fn is_ignored(&self, name: &str, abs: &Path) -> bool {
        name.contains('~')
            || name.ends_with(".tmp")
            || abs == self.state_file
    }

    // ========================================================================
    // Upload pass
    // ========================================================================

    /// Reconciles one local entry against every applicable transport
    async fn process_item(&self, item: &LocalItem, report: &mut CycleReport) -> Result<()> {
        // Transports this entry applies to: folders only go to destinations
        // with folder semantics.
        let relevant: Vec<&Arc<dyn ITransport>> = self
            .registry
            .iter()
            .filter(|t| item.kind != EntryKind::Folder || t.supports_folders())
            .collect();
        if relevant.is_empty() {
            debug!(path = %item.path, "No applicable transport");
            return Ok(());
        }

        let digest = match item.kind {
            EntryKind::Folder => ContentDigest::directory(),
            EntryKind::File => {
                if item.size > self.max_file_size {
                    debug!(path = %item.path, size = item.size, "File over size limit, skipping");
                    report.skipped += 1;
                    return Ok(());
                }
                match fingerprint::digest_file(&item.abs).await {
                    Ok(digest) => digest,
                    Err(e) => {
                        warn!(path = %item.path, error = %e, "Fingerprinting failed");
                        report.errors += 1;
                        return Ok(());
                    }
                }
            }
        };

        let prior = self.store.get(&item.path).await?;
        let relevant_names: Vec<&TransportName> = relevant.iter().map(|t| t.name()).collect();

        if let Some(prior) = &prior {
            if prior.is_clean(&digest, &relevant_names) {
                report.skipped += 1;
                return Ok(());
            }
        }

        // Dirty means the content behind the stored refs is gone; every
        // relevant transport must be refreshed and stale refs for configured
        // transports are superseded. A clean entry with missing refs only
        // needs the gaps filled.
        let dirty = prior
            .as_ref()
            .map_or(true, |p| p.content_hash != digest);

        let mut merged: BTreeMap<TransportName, RemoteRef> = match (&prior, dirty) {
            (None, _) => BTreeMap::new(),
            (Some(p), false) => p.remote_refs.clone(),
            (Some(p), true) => {
                // Stale refs for configured transports are superseded by the
                // refresh below; refs for transports that left the
                // configuration are kept as-is.
                let mut kept = BTreeMap::new();
                for (name, reference) in &p.remote_refs {
                    if self.registry.get(name).is_none() {
                        warn!(
                            path = %item.path,
                            transport = %name,
                            "Keeping ref for unconfigured transport"
                        );
                        kept.insert(name.clone(), reference.clone());
                    }
                }
                kept
            }
        };

        let parent_entry = match item.path.parent() {
            Some(parent) => self.store.get(&parent).await?,
            None => None,
        };

        let mut successes = 0u64;
        for transport in relevant {
            if !dirty && prior.as_ref().is_some_and(|p| p.has_ref(transport.name())) {
                continue;
            }

            // Resolve the parent folder ref for destinations with folder
            // semantics; flat destinations always receive a root upload.
            let parent_ref = if transport.supports_folders() && item.path.parent().is_some() {
                match parent_entry
                    .as_ref()
                    .and_then(|e| e.ref_for(transport.name()))
                {
                    Some(r) => Some(r.clone()),
                    None => {
                        warn!(
                            path = %item.path,
                            transport = %transport.name(),
                            "Parent folder has no ref yet, deferring to next cycle"
                        );
                        report.errors += 1;
                        continue;
                    }
                }
            } else {
                None
            };

            let outcome = match item.kind {
                EntryKind::Folder => transport.mkdir(item.path.name(), parent_ref.as_ref()).await,
                EntryKind::File => {
                    transport
                        .upload(&item.abs, item.path.name(), parent_ref.as_ref())
                        .await
                }
            };

            match outcome {
                Ok(reference) => {
                    debug!(
                        path = %item.path,
                        transport = %transport.name(),
                        reference = %reference,
                        "Remote operation succeeded"
                    );
                    merged.insert(transport.name().clone(), reference);
                    successes += 1;
                    match item.kind {
                        EntryKind::Folder => report.folders_created += 1,
                        EntryKind::File => report.files_uploaded += 1,
                    }
                }
                Err(e) => {
                    warn!(
                        path = %item.path,
                        transport = %transport.name(),
                        error = %e,
                        "Remote operation failed, will retry next cycle"
                    );
                    report.errors += 1;
                }
            }
        }

        // Persist only on progress: with zero successes the prior record
        // (or its absence) already describes the situation, and keeping the
        // old hash keeps the path a retry candidate.
        if successes > 0 {
            self.store
                .upsert(TrackedEntry::new(
                    item.path.clone(),
                    item.kind,
                    digest,
                    merged,
                ))
                .await?;
        }

        Ok(())
    }

    // ========================================================================
    // Deletion pass
    // ========================================================================

    /// Deletes remote copies of tracked paths that vanished locally
    ///
    /// Children are processed before their parents so remote folders are
    /// emptied before their own deletion is attempted. Anything under a
    /// subtree the enumeration could not read is treated as still present;
    /// an unreadable directory must never look like a deletion.
    async fn process_removals(
        &self,
        local: &BTreeSet<&EntryPath>,
        skipped: &[EntryPath],
        report: &mut CycleReport,
    ) -> Result<()> {
        let mut stale: Vec<TrackedEntry> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|e| {
                !local.contains(&e.path)
                    && !skipped.iter().any(|prefix| e.path.starts_with(prefix))
            })
            .collect();
        stale.sort_by(|a, b| {
            b.path
                .depth()
                .cmp(&a.path.depth())
                .then_with(|| b.path.cmp(&a.path))
        });

        for mut entry in stale {
            if self.cancel.is_cancelled() {
                info!("Cycle cancelled during deletion pass");
                report.cancelled = true;
                break;
            }

            let mut changed = false;
            for (name, reference) in entry.remote_refs.clone() {
                match self.registry.get(&name) {
                    Some(transport) => {
                        match transport.delete(&reference, entry.kind.is_folder()).await {
                            Ok(()) => {
                                debug!(
                                    path = %entry.path,
                                    transport = %name,
                                    "Remote deletion confirmed"
                                );
                                entry.clear_ref(&name);
                                changed = true;
                            }
                            Err(e) => {
                                warn!(
                                    path = %entry.path,
                                    transport = %name,
                                    error = %e,
                                    "Remote deletion failed, keeping ref"
                                );
                                report.errors += 1;
                            }
                        }
                    }
                    None => {
                        warn!(
                            path = %entry.path,
                            transport = %name,
                            "Transport no longer configured, keeping ref"
                        );
                    }
                }
            }

            // The record is released only once no ref is left; anything
            // still holding a ref stays tracked and is retried.
            if entry.remote_refs.is_empty() {
                self.store.remove(&entry.path).await?;
                report.deleted += 1;
                info!(path = %entry.path, "Tracked record released");
            } else if changed {
                self.store.upsert(entry).await?;
            }
        }

        Ok(())
    }
}

/// Best-effort canonicalization for path comparisons
///
/// A path that does not exist yet (the state file before first persist)
/// falls back to its parent's canonical form plus the file name, so the
/// comparison is stable across symlinked prefixes and `.` components.
fn canonicalized(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    path.to_path_buf()
}

// ============================================================================
// Tests
// ============================================================================
