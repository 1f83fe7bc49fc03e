//! slotwatch HTTP server library.
//!
//! Exposes configuration, shared state, the exporters and the router so the
//! binary entrypoint and integration tests build the exact same service.

pub mod config;
pub mod error;
pub mod export;
pub mod router;
pub mod routes;
pub mod state;
