//! Filesystem event source and debounced change queue
//!
//! [`FileWatcher`] wraps the `notify` crate and converts raw OS events into
//! [`ChangeEvent`] values on an mpsc channel. Events are only triggers: the
//! engine always reconciles the full tree, so a lost or duplicated event
//! costs at most one extra cycle, never correctness.
//!
//! [`DebouncedChangeQueue`] coalesces rapid-fire events per path so a file
//! being actively written triggers one cycle after it goes quiet, not one
//! per intermediate save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// ============================================================================
// ChangeEvent
// ============================================================================

/// A filesystem change observed under the watch root
///
/// Decoupled from `notify`'s raw event types; downstream code never sees the
/// OS-level representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A file or directory appeared
    Created(PathBuf),
    /// A file's content or metadata changed
    Modified(PathBuf),
    /// A file or directory disappeared
    Removed(PathBuf),
    /// A file or directory moved within the watched tree
    Renamed {
        /// Path before the move
        old: PathBuf,
        /// Path after the move
        new: PathBuf,
    },
}

impl ChangeEvent {
    /// The path this event is keyed on (the destination for renames)
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) => p,
            ChangeEvent::Modified(p) => p,
            ChangeEvent::Removed(p) => p,
            ChangeEvent::Renamed { new, .. } => new,
        }
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Recursive directory watcher built on the OS-native mechanism
///
/// On Linux this is inotify. Mapped events are sent through a bounded mpsc
/// channel; if the receiver falls behind, drops are logged and the next
/// full cycle picks up whatever was missed.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a watcher and the receiving end of its event channel
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created.
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (tx, rx) = mpsc::channel::<ChangeEvent>(1024);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        if let Err(e) = tx.blocking_send(change) {
                            warn!(error = %e, "Dropping change event (receiver gone)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher }, rx))
    }

    /// Starts watching `root` and everything below it
    ///
    /// # Errors
    /// Returns an error if the path cannot be watched (missing directory,
    /// permissions, or inotify watch limit).
    pub fn watch(&mut self, root: &Path) -> Result<()> {
        info!(root = %root.display(), "Starting recursive watch");
        self.watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))
    }
}

// ============================================================================
// Event mapping
// ============================================================================

/// Maps a raw `notify` event to a [`ChangeEvent`], or drops it
///
/// Access events carry no reconciliation signal and are ignored. A rename
/// reported with a single path cannot be paired, so it degrades to a
/// modification of that path; the full-tree cycle sorts out the rest.
fn map_notify_event(event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => Some(ChangeEvent::Created(paths.first()?.clone())),

        EventKind::Remove(_) => Some(ChangeEvent::Removed(paths.first()?.clone())),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if paths.len() >= 2 {
                Some(ChangeEvent::Renamed {
                    old: paths[0].clone(),
                    new: paths[1].clone(),
                })
            } else {
                Some(ChangeEvent::Modified(paths.first()?.clone()))
            }
        }

        EventKind::Modify(_) => Some(ChangeEvent::Modified(paths.first()?.clone())),

        other => {
            debug!(kind = ?other, "Ignoring event kind");
            None
        }
    }
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Coalesces bursts of events into one settled change per path
///
/// Each push replaces the pending event for its path and resets its
/// timestamp; [`poll`](DebouncedChangeQueue::poll) only releases events that
/// have been quiet for the full debounce window. A file under continuous
/// write keeps extending its window until the writes stop.
pub struct DebouncedChangeQueue {
    pending: HashMap<PathBuf, (ChangeEvent, Instant)>,
    debounce_delay: Duration,
}

impl DebouncedChangeQueue {
    /// Creates a queue with the given quiet window
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            debounce_delay,
        }
    }

    /// Inserts or replaces the pending event for the event's path
    pub fn push(&mut self, event: ChangeEvent) {
        let path = event.path().to_path_buf();
        self.pending.insert(path, (event, Instant::now()));
    }

    /// Removes and returns every event older than the debounce window
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let settled_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, stamp))| now.duration_since(*stamp) >= self.debounce_delay)
            .map(|(path, _)| path.clone())
            .collect();

        settled_paths
            .iter()
            .filter_map(|path| self.pending.remove(path).map(|(event, _)| event))
            .collect()
    }

    /// Number of events still inside their quiet window
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
