//! Cycle scheduler - turns settled change events into sync triggers
//!
//! Sits between the [`FileWatcher`](crate::watcher::FileWatcher) and the
//! [`ReconcileEngine`](crate::engine::ReconcileEngine): receives raw change
//! events, runs them through a [`DebouncedChangeQueue`], and raises a shared
//! flag when a reconciliation cycle should start.
//!
//! ```text
//! FileWatcher ──→ mpsc::Receiver ──→ SyncScheduler ──→ sync_requested flag
//!                                        │
//!                                 DebouncedChangeQueue
//! ```
//!
//! The flag is level-triggered, not a queue: any number of settled changes
//! collapse into one pending cycle, which is all the full-tree engine needs.
//! User-initiated "sync now" requests set the flag directly, skipping the
//! debounce window.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

// ============================================================================
// SyncScheduler
// ============================================================================

/// Debounces filesystem events and requests reconciliation cycles
pub struct SyncScheduler {
    /// Receiver for change events from the watcher
    change_rx: mpsc::Receiver<ChangeEvent>,
    /// Coalesces rapid-fire events per path
    queue: DebouncedChangeQueue,
    /// Shared flag read by the run loop that owns the engine
    sync_requested: Arc<AtomicBool>,
    /// How often the debounce queue is checked for settled events
    poll_interval: Duration,
}

impl SyncScheduler {
    /// Creates a scheduler and the flag it raises
    ///
    /// # Arguments
    /// * `change_rx` - Channel receiver fed by the watcher
    /// * `debounce_delay` - Quiet window a path must satisfy before triggering
    /// * `poll_interval` - How often settled events are checked for
    pub fn new(
        change_rx: mpsc::Receiver<ChangeEvent>,
        debounce_delay: Duration,
        poll_interval: Duration,
    ) -> (Self, Arc<AtomicBool>) {
        let sync_requested = Arc::new(AtomicBool::new(false));
        let flag = sync_requested.clone();

        let scheduler = Self {
            change_rx,
            queue: DebouncedChangeQueue::new(debounce_delay),
            sync_requested,
            poll_interval,
        };

        (scheduler, flag)
    }

    /// Requests an immediate cycle, bypassing the debounce window
    pub fn request_sync(&self) {
        info!("Immediate sync requested");
        self.sync_requested.store(true, Ordering::Release);
    }

    /// Main loop: drain events into the queue, raise the flag when settled
    ///
    /// Terminates when the change channel closes (watcher dropped), flushing
    /// any already-settled events first.
    pub async fn run(&mut self) {
        info!("Sync scheduler starting");

        let mut poll_timer = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                event = self.change_rx.recv() => {
                    match event {
                        Some(change) => {
                            debug!(path = %change.path().display(), "Change observed");
                            self.queue.push(change);
                        }
                        None => {
                            if !self.queue.poll().is_empty() {
                                self.sync_requested.store(true, Ordering::Release);
                            }
                            break;
                        }
                    }
                }

                _ = poll_timer.tick() => {
                    let settled = self.queue.poll();
                    if !settled.is_empty() {
                        info!(count = settled.len(), "Settled changes, requesting cycle");
                        self.sync_requested.store(true, Ordering::Release);
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// Reads the flag without clearing it
    pub fn is_sync_requested(&self) -> bool {
        self.sync_requested.load(Ordering::Acquire)
    }

    /// Clears the flag; call once a cycle has been started
    pub fn clear_sync_request(&self) {
        self.sync_requested.store(false, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================
