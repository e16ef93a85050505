//! # fanout-store
//!
//! JSON file adapter for the [`IStateStore`](fanout_core::ports::IStateStore)
//! port: the durable mapping from local path to tracked entry, persisted as a
//! single human-readable JSON document.
//!
//! The store is crash-consistent (atomic replace via temp file + rename) and
//! tolerant of a corrupt or legacy-format state file on load.

pub mod repository;

pub use repository::JsonStateStore;
