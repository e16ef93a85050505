//! # fanout-sync
//!
//! The heart of Fanout: a single-writer reconciliation engine that mirrors a
//! local directory tree to every configured transport, plus the file watcher
//! and scheduler that decide when a reconciliation cycle runs.
//!
//! ## Modules
//!
//! - [`engine`] - The cycle algorithm: enumerate, classify, dispatch, delete
//! - [`fingerprint`] - Streaming content digests for change detection
//! - [`watcher`] - Filesystem event source and debounced change queue
//! - [`scheduler`] - Turns settled changes into cycle triggers

pub mod engine;
pub mod fingerprint;
pub mod scheduler;
pub mod watcher;

pub use engine::{CycleReport, ReconcileEngine};
pub use scheduler::SyncScheduler;
pub use watcher::{ChangeEvent, DebouncedChangeQueue, FileWatcher};
