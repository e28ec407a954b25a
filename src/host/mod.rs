//! Host capabilities injected into the daemon manager
//!
//! The manager never owns a timer or an event bus. Whatever environment embeds
//! it supplies three primitives through the [`Host`] trait:
//! - start a repeating interval
//! - stop a repeating interval
//! - subscribe to a named event, getting back an unsubscribe callback
//!
//! Ticks and event handlers hand back a future; the host decides how to drive
//! it. [`TokioHost`] spawns each one on the runtime, [`ManualHost`] awaits them
//! inline when a test asks it to.

pub mod manual;
pub mod tokio_host;

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub use manual::ManualHost;
pub use tokio_host::TokioHost;

/// Owned, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Work performed on every interval tick
pub type Tick = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Handler invoked with the payload an event was emitted with
pub type EventHandler = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Removes a subscription created by [`Host::subscribe_to_event`]
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Scheduling and event-bus primitives of the embedding environment
pub trait Host: Send + Sync {
    /// Opaque handle identifying a running interval
    type IntervalHandle: Send + 'static;

    /// Call `tick` every `delay`, first call one `delay` from now
    fn start_interval(&self, tick: Tick, delay: Duration) -> Self::IntervalHandle;

    /// Stop an interval previously returned by `start_interval`
    fn stop_interval(&self, handle: Self::IntervalHandle);

    /// Call `handler` whenever `event` is emitted until the returned
    /// callback is invoked
    fn subscribe_to_event(&self, event: &str, handler: EventHandler) -> Unsubscribe;
}
