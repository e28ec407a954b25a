//! Daemon configuration values handed to [`DataDaemonManager::add_daemon`].
//!
//! [`DataDaemonManager::add_daemon`]: super::DataDaemonManager::add_daemon

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::host::BoxFuture;

/// Remote call supplied per daemon or per trigger. Resolves with the value to
/// cache and broadcast.
pub type FetchFn<T> = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Produces the arguments passed to a fetch function
pub type ArgsFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Box an async closure as a [`FetchFn`]
pub fn fetch_fn<T, F, Fut>(f: F) -> FetchFn<T>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    Arc::new(move |args: Option<Value>| -> BoxFuture<'static, anyhow::Result<T>> {
        Box::pin(f(args))
    })
}

/// Box a closure as an [`ArgsFn`]
pub fn args_fn<F>(f: F) -> ArgsFn
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How a daemon is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonType {
    /// Polled by a repeating interval chosen by the daemon's status
    Timer,
    /// Fired by named external events
    Event,
}

impl fmt::Display for DaemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonType::Timer => write!(f, "timer"),
            DaemonType::Event => write!(f, "event"),
        }
    }
}

/// Fetch logic bound to one external event of an event daemon
pub struct EventTrigger<T> {
    pub fetch: FetchFn<T>,
    pub get_args: Option<ArgsFn>,
    /// Minimum spacing between fetches; activations arriving sooner are dropped
    pub throttle: Option<Duration>,
}

impl<T> EventTrigger<T> {
    pub fn new(fetch: FetchFn<T>) -> Self {
        Self {
            fetch,
            get_args: None,
            throttle: None,
        }
    }

    pub fn with_args(mut self, get_args: ArgsFn) -> Self {
        self.get_args = Some(get_args);
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = Some(throttle);
        self
    }
}

impl<T> Clone for EventTrigger<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: Arc::clone(&self.fetch),
            get_args: self.get_args.clone(),
            throttle: self.throttle,
        }
    }
}

impl<T> fmt::Debug for EventTrigger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTrigger")
            .field("has_args", &self.get_args.is_some())
            .field("throttle", &self.throttle)
            .finish()
    }
}

/// Everything the manager needs to run one daemon.
///
/// Handed over by value: the manager keeps its own copy and later changes to
/// a clone held by the caller have no effect on the managed daemon.
pub struct DaemonConfig<T> {
    pub name: String,
    pub daemon_type: DaemonType,
    /// User-defined; selects the polling interval of a timer daemon
    pub status: String,
    /// Used by timer ticks and by `force_get_data`
    pub fetch: Option<FetchFn<T>>,
    pub get_args: Option<ArgsFn>,
    /// Polling interval per status (timer daemons)
    pub intervals: HashMap<String, Duration>,
    /// Triggers keyed by event name (event daemons)
    pub event_triggers: BTreeMap<String, EventTrigger<T>>,
}

impl<T> DaemonConfig<T> {
    /// Timer daemon polling `fetch`, starting in `status`
    pub fn timer(name: impl Into<String>, status: impl Into<String>, fetch: FetchFn<T>) -> Self {
        Self {
            name: name.into(),
            daemon_type: DaemonType::Timer,
            status: status.into(),
            fetch: Some(fetch),
            get_args: None,
            intervals: HashMap::new(),
            event_triggers: BTreeMap::new(),
        }
    }

    /// Event daemon with no triggers yet
    pub fn event(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            daemon_type: DaemonType::Event,
            status: String::new(),
            fetch: None,
            get_args: None,
            intervals: HashMap::new(),
            event_triggers: BTreeMap::new(),
        }
    }

    pub fn with_interval(mut self, status: impl Into<String>, interval: Duration) -> Self {
        self.intervals.insert(status.into(), interval);
        self
    }

    pub fn with_trigger(mut self, event: impl Into<String>, trigger: EventTrigger<T>) -> Self {
        self.event_triggers.insert(event.into(), trigger);
        self
    }

    pub fn with_fetch(mut self, fetch: FetchFn<T>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn with_args(mut self, get_args: ArgsFn) -> Self {
        self.get_args = Some(get_args);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

impl<T> Clone for DaemonConfig<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            daemon_type: self.daemon_type,
            status: self.status.clone(),
            fetch: self.fetch.clone(),
            get_args: self.get_args.clone(),
            intervals: self.intervals.clone(),
            event_triggers: self.event_triggers.clone(),
        }
    }
}

impl<T> fmt::Debug for DaemonConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonConfig")
            .field("name", &self.name)
            .field("daemon_type", &self.daemon_type)
            .field("status", &self.status)
            .field("has_fetch", &self.fetch.is_some())
            .field("intervals", &self.intervals)
            .field("event_triggers", &self.event_triggers)
            .finish()
    }
}
