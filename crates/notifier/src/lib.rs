//! Deferred, deduplicated Kodi JSON-RPC notifications.
//!
//! Callers enqueue named tasks on a shared [`Dispatcher`]. A background loop
//! pings Kodi once per flush interval and, when it answers, sends every
//! pending task as its own JSON-RPC call.

pub mod dispatcher;
pub mod methods;
pub mod queue;
pub mod transport;

pub use dispatcher::{CycleOutcome, CycleReport, Dispatcher};
pub use queue::{DrainReport, NotifyQueue, PendingTask};
pub use transport::{HttpTransport, RpcTransport};
