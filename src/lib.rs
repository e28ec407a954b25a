//! Data Daemons Library
//!
//! Supervises named "data daemons": units that fetch data from a remote
//! service on a timer or in response to events, cache the latest value and
//! broadcast copies of it to listeners.

pub mod config;
pub mod daemon;
pub mod errors;
pub mod fetch;
pub mod host;
pub mod listeners;

// Re-export commonly used types for convenience
pub use daemon::{fetch_fn, DaemonConfig, DaemonType, DataDaemonManager, EventTrigger};
pub use errors::{AppError, AppResult};
pub use host::{Host, ManualHost, TokioHost};
pub use listeners::{ListenerCollection, ListenerId};
