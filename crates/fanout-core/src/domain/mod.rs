//! Domain entities and business logic
//!
//! This module contains the core domain types for Fanout:
//! - Newtypes for validated paths, transport names, refs and digests
//! - The `TrackedEntry` record and its entry kind
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod tracked_entry;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{ContentDigest, EntryPath, RemoteRef, TransportName};
pub use tracked_entry::{EntryKind, TrackedEntry};
