//! # fanout-http
//!
//! [`ITransport`](fanout_core::ports::ITransport) adapter for a bearer-token
//! HTTP object API. The endpoint is a single URL dispatching on an `action`
//! query parameter (`upload`, `delete`, `mkdir`); the server assigns opaque
//! object IDs that become this transport's remote refs.

pub mod transport;

pub use transport::HttpApiTransport;
