//! HTTP surface for queueing Kodi notifications.
//!
//! Endpoints:
//! - GET  /health: Liveness plus dispatcher state
//! - POST /api/notify/{name}: Queue a JSON-RPC call under a dedup name
//! - GET  /api/queue: Inspect pending task names

pub mod routes;
pub mod state;
