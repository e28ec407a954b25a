//! Data daemons and their manager
//!
//! This module provides:
//! - Daemon configuration values (timer and event daemons)
//! - The cache-and-broadcast wrapper applied to every fetch function
//! - Per-trigger throttling
//! - [`DataDaemonManager`], which owns the daemons and wires them to a host

pub mod config;
mod handler;
pub mod manager;
pub mod throttle;

pub use config::{args_fn, fetch_fn, ArgsFn, DaemonConfig, DaemonType, EventTrigger, FetchFn};
pub use manager::DataDaemonManager;
pub use throttle::Throttle;
