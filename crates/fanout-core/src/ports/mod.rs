//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITransport`] - Remote destination operations (upload, delete, mkdir)
//! - [`IStateStore`] - Durable mapping from local path to tracked entry

pub mod state_store;
pub mod transport;

pub use state_store::IStateStore;
pub use transport::{ITransport, TransportRegistry};
