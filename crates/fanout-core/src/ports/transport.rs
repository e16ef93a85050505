//! Transport port (driven/secondary port)
//!
//! This module defines the capability interface for remote destinations.
//! Concrete implementations live in adapter crates (`fanout-http` for the
//! bearer-token object API; further destination kinds implement the same
//! trait). The reconciliation engine depends only on this interface.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification. The engine
//!   treats every failure the same way: log, skip, retry next cycle.
//! - Folder support is a capability, not a separate trait: a transport
//!   without folder semantics reports `supports_folders() == false` and the
//!   engine never calls `mkdir` on it nor passes parent refs to `upload`.
//! - Implementations must bound each call with a timeout so one unreachable
//!   destination cannot stall a whole cycle.

use std::path::Path;
use std::sync::Arc;

use crate::domain::newtypes::{RemoteRef, TransportName};

// ============================================================================
// ITransport trait
// ============================================================================

/// Port trait for a pluggable remote storage destination
///
/// All operations are best-effort from the engine's perspective: a failed
/// call fails that transport for the current cycle only. Calls to distinct
/// transports are independent by contract.
#[async_trait::async_trait]
pub trait ITransport: Send + Sync {
    /// Stable identifier of this transport, the key under which its remote
    /// refs are recorded in the state store
    fn name(&self) -> &TransportName;

    /// Whether this destination has folder semantics
    ///
    /// When false, the transport receives files into a flat (or pre-agreed)
    /// namespace, `mkdir` is never invoked, and folder tracking is a no-op
    /// for it.
    fn supports_folders(&self) -> bool;

    /// Creates a remote folder and returns its reference
    ///
    /// # Arguments
    /// * `name` - The folder name
    /// * `parent` - Ref of the parent folder, or `None` at the remote root
    async fn mkdir(&self, name: &str, parent: Option<&RemoteRef>) -> anyhow::Result<RemoteRef>;

    /// Uploads a local file and returns the reference to the remote object
    ///
    /// # Arguments
    /// * `local_path` - Absolute path of the file to read
    /// * `name` - The remote file name
    /// * `parent` - Ref of the parent folder, or `None` at the remote root
    async fn upload(
        &self,
        local_path: &Path,
        name: &str,
        parent: Option<&RemoteRef>,
    ) -> anyhow::Result<RemoteRef>;

    /// Deletes a remote object or folder
    ///
    /// Deleting a ref that is already gone should not be reported as an
    /// error where the adapter can tell the difference; the engine treats
    /// deletion as idempotent either way.
    async fn delete(&self, reference: &RemoteRef, is_folder: bool) -> anyhow::Result<()>;
}

// ============================================================================
// TransportRegistry
// ============================================================================

/// The set of transports configured for this run
///
/// Built once at startup from configuration and passed by reference into the
/// engine; there is no ambient global transport state. Iteration order is
/// the configuration order and is stable within a run.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    transports: Vec<Arc<dyn ITransport>>,
}

impl TransportRegistry {
    /// Creates a registry from the given transports
    #[must_use]
    pub fn new(transports: Vec<Arc<dyn ITransport>>) -> Self {
        Self { transports }
    }

    /// Number of configured transports
    #[must_use]
    pub fn len(&self) -> usize {
        self.transports.len()
    }

    /// Returns true if no transports are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Iterates over the configured transports in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ITransport>> {
        self.transports.iter()
    }

    /// The names of all configured transports, in configuration order
    #[must_use]
    pub fn names(&self) -> Vec<&TransportName> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Looks up a transport by name
    #[must_use]
    pub fn get(&self, name: &TransportName) -> Option<&Arc<dyn ITransport>> {
        self.transports.iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("names", &self.names())
            .finish()
    }
}
