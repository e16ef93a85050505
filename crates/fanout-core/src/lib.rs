//! Fanout Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `TrackedEntry`, the durable record linking a local
//!   path to its last-confirmed content digest and remote references
//! - **Port definitions** - Traits for adapters: `ITransport`, `IStateStore`
//! - **Configuration** - Typed config loaded from YAML with validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement: the JSON state
//! store lives in `fanout-store`, remote transports in `fanout-http` (and any
//! future destination crates), and the reconciliation engine that drives them
//! in `fanout-sync`.

pub mod config;
pub mod domain;
pub mod ports;
