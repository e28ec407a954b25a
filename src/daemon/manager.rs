//! The daemon manager: registration, lifecycle, status changes and data access.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::config::{ArgsFn, DaemonConfig, DaemonType};
use super::handler::{DaemonCell, DataHandler};
use super::throttle::Throttle;
use crate::errors::{AppError, AppResult};
use crate::host::{BoxFuture, EventHandler, Host, Tick, Unsubscribe};
use crate::listeners::ListenerId;

/// One event trigger after decoration
struct Trigger<T> {
    event: String,
    handler: DataHandler<T>,
    get_args: Option<ArgsFn>,
    throttle: Option<Throttle>,
}

impl<T: Clone + Send + Sync + 'static> Trigger<T> {
    fn activate(&self, payload: Option<Value>) -> BoxFuture<'static, ()> {
        if let Some(throttle) = &self.throttle {
            if !throttle.try_pass() {
                debug!(
                    "Dropping '{}' activation of daemon '{}': throttled ({:?})",
                    self.event,
                    self.handler.daemon_name(),
                    throttle.period()
                );
                return Box::pin(async {});
            }
        }

        let args = match &self.get_args {
            Some(get_args) => Some(get_args()),
            None => payload,
        };
        let pending = self.handler.call(args);
        let event = self.event.clone();

        Box::pin(async move {
            if let Err(e) = pending.await {
                warn!("Activation by event '{}' failed: {}", event, e);
            }
        })
    }
}

/// Whether a daemon is wired to its host, and through what
enum RunState<H> {
    Stopped,
    Ticking(H),
    Subscribed(Vec<Unsubscribe>),
}

impl<H> RunState<H> {
    fn is_running(&self) -> bool {
        !matches!(self, RunState::Stopped)
    }
}

struct ManagedDaemon<T, H> {
    daemon_type: DaemonType,
    status: String,
    cell: Arc<DaemonCell<T>>,
    handler: Option<DataHandler<T>>,
    get_args: Option<ArgsFn>,
    intervals: HashMap<String, Duration>,
    triggers: Vec<Arc<Trigger<T>>>,
    state: RunState<H>,
}

impl<T, H> ManagedDaemon<T, H> {
    fn stop<X>(&mut self, host: &X)
    where
        X: Host<IntervalHandle = H>,
    {
        match std::mem::replace(&mut self.state, RunState::Stopped) {
            RunState::Stopped => {}
            RunState::Ticking(handle) => host.stop_interval(handle),
            RunState::Subscribed(unsubscribes) => {
                for unsubscribe in unsubscribes {
                    unsubscribe();
                }
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static, H> ManagedDaemon<T, H> {
    fn build(config: DaemonConfig<T>) -> AppResult<Self> {
        let DaemonConfig {
            name,
            daemon_type,
            status,
            fetch,
            get_args,
            intervals,
            event_triggers,
        } = config;

        if name.trim().is_empty() {
            return Err(AppError::invalid_daemon(name, "daemon name must not be empty"));
        }
        if daemon_type == DaemonType::Timer && fetch.is_none() {
            return Err(AppError::invalid_daemon(
                name,
                "timer daemons require a fetch function",
            ));
        }
        if daemon_type == DaemonType::Event && event_triggers.is_empty() {
            debug!("Event daemon '{}' registered without triggers", name);
        }

        let cell = Arc::new(DaemonCell::new(name));
        let handler = fetch.map(|fetch| DataHandler::new(Arc::clone(&cell), fetch));
        let triggers = event_triggers
            .into_iter()
            .map(|(event, trigger)| {
                Arc::new(Trigger {
                    event,
                    handler: DataHandler::new(Arc::clone(&cell), trigger.fetch),
                    get_args: trigger.get_args,
                    throttle: trigger
                        .throttle
                        .filter(|period| !period.is_zero())
                        .map(Throttle::new),
                })
            })
            .collect();

        Ok(Self {
            daemon_type,
            status,
            cell,
            handler,
            get_args,
            intervals,
            triggers,
            state: RunState::Stopped,
        })
    }

    fn start<X>(&mut self, host: &X) -> AppResult<()>
    where
        X: Host<IntervalHandle = H>,
    {
        match self.daemon_type {
            DaemonType::Timer => self.start_timer(host),
            DaemonType::Event => {
                self.start_event(host);
                Ok(())
            }
        }
    }

    fn start_timer<X>(&mut self, host: &X) -> AppResult<()>
    where
        X: Host<IntervalHandle = H>,
    {
        self.stop(host);

        let name = self.cell.name().to_string();
        let delay = self
            .intervals
            .get(&self.status)
            .copied()
            .filter(|delay| !delay.is_zero())
            .ok_or_else(|| AppError::NoInterval {
                name: name.clone(),
                status: self.status.clone(),
            })?;
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| AppError::NoFetchFunction { name: name.clone() })?;
        let get_args = self.get_args.clone();

        let tick: Tick = Arc::new(move || -> BoxFuture<'static, ()> {
            let args = get_args.as_ref().map(|get_args| get_args());
            let pending = handler.call(args);
            let name = name.clone();

            Box::pin(async move {
                if let Err(e) = pending.await {
                    warn!("Timer activation of daemon '{}' failed: {}", name, e);
                }
            })
        });

        self.state = RunState::Ticking(host.start_interval(tick, delay));
        info!(
            "Started timer daemon '{}' (status '{}', every {:?})",
            self.cell.name(),
            self.status,
            delay
        );
        Ok(())
    }

    fn start_event<X>(&mut self, host: &X)
    where
        X: Host<IntervalHandle = H>,
    {
        self.stop(host);

        if self.triggers.is_empty() {
            warn!(
                "Event daemon '{}' has no triggers; leaving it stopped",
                self.cell.name()
            );
            return;
        }

        let unsubscribes = self
            .triggers
            .iter()
            .map(|trigger| {
                let bound = Arc::clone(trigger);
                let handler: EventHandler =
                    Arc::new(move |payload: Option<Value>| bound.activate(payload));
                host.subscribe_to_event(&trigger.event, handler)
            })
            .collect::<Vec<_>>();

        info!(
            "Started event daemon '{}' ({} trigger(s))",
            self.cell.name(),
            unsubscribes.len()
        );
        self.state = RunState::Subscribed(unsubscribes);
    }
}

/// Supervises a set of named data daemons.
///
/// Timer daemons poll their fetch function on an interval selected by their
/// current status. Event daemons run a per-event fetch function whenever the
/// host emits one of their trigger events. Every successful fetch is cached
/// and each listener of the daemon receives its own clone of the value.
///
/// # Example
///
/// ```rust,no_run
/// use data_daemons::daemon::{fetch_fn, DaemonConfig, DataDaemonManager};
/// use data_daemons::host::TokioHost;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut manager = DataDaemonManager::new(TokioHost::new());
/// manager.add_daemon(
///     DaemonConfig::timer("clock", "active", fetch_fn(|_args| async {
///         Ok(chrono::Utc::now().to_rfc3339())
///     }))
///     .with_interval("active", Duration::from_secs(1))
///     .with_interval("idle", Duration::from_secs(60)),
/// )?;
/// manager.add_listener("clock", |now: String| println!("{now}"))?;
/// manager.start_all_daemons()?;
/// manager.change_status("clock", "idle")?;
/// # Ok(())
/// # }
/// ```
pub struct DataDaemonManager<T, H: Host> {
    host: H,
    daemons: HashMap<String, ManagedDaemon<T, H::IntervalHandle>>,
}

impl<T, H: Host> DataDaemonManager<T, H> {
    fn daemon(&self, name: &str) -> AppResult<&ManagedDaemon<T, H::IntervalHandle>> {
        self.daemons
            .get(name)
            .ok_or_else(|| AppError::daemon_not_found(name))
    }

    /// Stop the named daemon. Stopping a stopped daemon is a no-op.
    pub fn stop_daemon(&mut self, name: &str) -> AppResult<()> {
        let daemon = self
            .daemons
            .get_mut(name)
            .ok_or_else(|| AppError::daemon_not_found(name))?;
        if daemon.state.is_running() {
            info!("Stopping daemon '{}'", name);
        }
        daemon.stop(&self.host);
        Ok(())
    }

    pub fn stop_all_daemons(&mut self) {
        for daemon in self.daemons.values_mut() {
            daemon.stop(&self.host);
        }
        debug!("Stopped all {} daemon(s)", self.daemons.len());
    }
}

impl<T: Clone + Send + Sync + 'static, H: Host> DataDaemonManager<T, H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            daemons: HashMap::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Take ownership of `config` and register it under its name. The daemon
    /// is not started.
    ///
    /// Registering a name that is already present replaces the old entry
    /// without stopping it; stop or remove it first to avoid leaving its
    /// timer or subscriptions behind.
    pub fn add_daemon(&mut self, config: DaemonConfig<T>) -> AppResult<()> {
        let name = config.name.clone();
        let daemon = ManagedDaemon::build(config)?;

        if let Some(previous) = self.daemons.insert(name.clone(), daemon) {
            if previous.state.is_running() {
                warn!("Daemon '{}' replaced while still running", name);
            }
        }
        debug!("Registered daemon '{}'", name);
        Ok(())
    }

    /// Stop the named daemon and forget it
    pub fn remove_daemon(&mut self, name: &str) -> AppResult<()> {
        self.stop_daemon(name)?;
        self.daemons.remove(name);
        info!("Removed daemon '{}'", name);
        Ok(())
    }

    /// Start (or restart) the named daemon
    pub fn start_daemon(&mut self, name: &str) -> AppResult<()> {
        let daemon = self
            .daemons
            .get_mut(name)
            .ok_or_else(|| AppError::daemon_not_found(name))?;
        daemon.start(&self.host)
    }

    /// Restart the named daemon under `new_status`.
    ///
    /// For a timer daemon without an interval for `new_status` this fails and
    /// the daemon stays stopped.
    pub fn change_status(&mut self, name: &str, new_status: impl Into<String>) -> AppResult<()> {
        let daemon = self
            .daemons
            .get_mut(name)
            .ok_or_else(|| AppError::daemon_not_found(name))?;

        daemon.stop(&self.host);
        daemon.status = new_status.into();
        debug!("Daemon '{}' status changed to '{}'", name, daemon.status);
        daemon.start(&self.host)
    }

    pub fn add_listener<F>(&self, name: &str, listener: F) -> AppResult<ListenerId>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Ok(self.daemon(name)?.cell.add_listener(Arc::new(listener)))
    }

    pub fn remove_listener(&self, name: &str, id: ListenerId) -> AppResult<()> {
        self.daemon(name)?.cell.remove_listener(id);
        Ok(())
    }

    /// Copy of the last value fetched by the named daemon. Never fetches.
    pub fn get_data(&self, name: &str) -> AppResult<Option<T>> {
        Ok(self.daemon(name)?.cell.data())
    }

    /// Fetch now, bypassing timers and throttles.
    ///
    /// The args getter and fetch function run before this returns; the
    /// returned future caches and broadcasts the result exactly like a
    /// scheduled activation.
    pub fn force_get_data(
        &self,
        name: &str,
    ) -> AppResult<impl Future<Output = AppResult<T>> + Send + 'static> {
        let daemon = self.daemon(name)?;
        let handler = daemon
            .handler
            .as_ref()
            .ok_or_else(|| AppError::NoFetchFunction {
                name: name.to_string(),
            })?;
        let args = daemon.get_args.as_ref().map(|get_args| get_args());

        debug!("Forcing fetch for daemon '{}'", name);
        Ok(handler.call(args))
    }

    /// Start every daemon. A daemon that fails to start does not prevent the
    /// others from starting; the failures are reported together.
    pub fn start_all_daemons(&mut self) -> AppResult<()> {
        let mut failed = Vec::new();

        for (name, daemon) in self.daemons.iter_mut() {
            if let Err(e) = daemon.start(&self.host) {
                error!("Failed to start daemon '{}': {}", name, e);
                failed.push(name.clone());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            failed.sort();
            Err(AppError::PartialStart { failed })
        }
    }

    /// Registered daemon names, sorted
    pub fn daemon_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.daemons.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn status(&self, name: &str) -> AppResult<&str> {
        Ok(&self.daemon(name)?.status)
    }

    pub fn daemon_type(&self, name: &str) -> AppResult<DaemonType> {
        Ok(self.daemon(name)?.daemon_type)
    }

    pub fn is_running(&self, name: &str) -> AppResult<bool> {
        Ok(self.daemon(name)?.state.is_running())
    }

    pub fn listener_count(&self, name: &str) -> AppResult<usize> {
        Ok(self.daemon(name)?.cell.listener_count())
    }

    /// Interval the named timer daemon would use in its current status
    pub fn current_interval(&self, name: &str) -> AppResult<Option<Duration>> {
        let daemon = self.daemon(name)?;
        Ok(daemon.intervals.get(&daemon.status).copied())
    }

    pub fn len(&self) -> usize {
        self.daemons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daemons.is_empty()
    }
}

impl<T, H: Host> Drop for DataDaemonManager<T, H> {
    fn drop(&mut self) {
        self.stop_all_daemons();
    }
}

impl<T, H: Host> fmt::Debug for DataDaemonManager<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.daemons.keys().collect();
        names.sort();
        f.debug_struct("DataDaemonManager")
            .field("daemons", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::config::{args_fn, fetch_fn, EventTrigger};
    use crate::host::ManualHost;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(counter: &Arc<AtomicUsize>) -> crate::daemon::FetchFn<usize> {
        let counter = Arc::clone(counter);
        fetch_fn(move |_args| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(n) }
        })
    }

    fn manager() -> DataDaemonManager<usize, ManualHost> {
        DataDaemonManager::new(ManualHost::new())
    }

    #[test]
    fn test_unknown_daemon_is_not_found() {
        let mut manager = manager();

        assert!(matches!(
            manager.get_data("missing"),
            Err(AppError::DaemonNotFound { .. })
        ));
        assert!(matches!(
            manager.remove_daemon("missing"),
            Err(AppError::DaemonNotFound { .. })
        ));
        assert!(matches!(
            manager.change_status("missing", "active"),
            Err(AppError::DaemonNotFound { .. })
        ));
        assert!(manager.add_listener("missing", |_v: usize| {}).is_err());
        assert!(manager.force_get_data("missing").is_err());
    }

    #[test]
    fn test_registration_does_not_start_or_fetch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(100)),
            )
            .unwrap();

        assert_eq!(manager.get_data("poll").unwrap(), None);
        assert!(!manager.is_running("poll").unwrap());
        assert!(manager.host().active_intervals().is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_registrations_rejected() {
        let mut manager = manager();

        let unnamed = DaemonConfig::timer(" ", "active", fetch_fn(|_args| async { Ok(1usize) }));
        assert!(matches!(
            manager.add_daemon(unnamed),
            Err(AppError::InvalidDaemonConfig { .. })
        ));

        let mut no_fetch = DaemonConfig::timer("t", "active", fetch_fn(|_args| async { Ok(1usize) }));
        no_fetch.fetch = None;
        assert!(matches!(
            manager.add_daemon(no_fetch),
            Err(AppError::InvalidDaemonConfig { .. })
        ));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_timer_ticks_update_cache() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(100)),
            )
            .unwrap();
        manager.start_daemon("poll").unwrap();

        assert_eq!(
            manager.host().active_intervals(),
            vec![Duration::from_millis(100)]
        );
        assert_eq!(manager.host().advance(Duration::from_millis(100)).await, 1);
        assert_eq!(manager.get_data("poll").unwrap(), Some(1));

        assert_eq!(manager.host().advance(Duration::from_millis(200)).await, 2);
        assert_eq!(manager.get_data("poll").unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_restarting_timer_keeps_single_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(100)),
            )
            .unwrap();

        manager.start_daemon("poll").unwrap();
        manager.start_daemon("poll").unwrap();
        assert_eq!(manager.host().active_intervals().len(), 1);
    }

    #[tokio::test]
    async fn test_change_status_switches_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(100))
                    .with_interval("idle", Duration::from_secs(5)),
            )
            .unwrap();
        manager.start_daemon("poll").unwrap();

        manager.change_status("poll", "idle").unwrap();
        assert_eq!(manager.status("poll").unwrap(), "idle");
        assert_eq!(
            manager.host().active_intervals(),
            vec![Duration::from_secs(5)]
        );
        assert_eq!(
            manager.current_interval("poll").unwrap(),
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn test_change_to_status_without_interval_leaves_daemon_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(100))
                    .with_interval("paused", Duration::ZERO),
            )
            .unwrap();
        manager.start_daemon("poll").unwrap();

        let err = manager.change_status("poll", "unknown").unwrap_err();
        assert!(matches!(err, AppError::NoInterval { ref status, .. } if status == "unknown"));
        assert!(!manager.is_running("poll").unwrap());
        assert!(manager.host().active_intervals().is_empty());

        // A zero interval counts as unset
        assert!(manager.change_status("poll", "paused").is_err());
        assert_eq!(manager.host().advance(Duration::from_secs(1)).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timer_uses_args_getter() {
        let mut manager: DataDaemonManager<serde_json::Value, ManualHost> =
            DataDaemonManager::new(ManualHost::new());
        manager
            .add_daemon(
                DaemonConfig::timer(
                    "echo",
                    "active",
                    fetch_fn(|args| async move { Ok(args.unwrap_or_default()) }),
                )
                .with_interval("active", Duration::from_millis(10))
                .with_args(args_fn(|| json!({"page": 1}))),
            )
            .unwrap();
        manager.start_daemon("echo").unwrap();
        manager.host().advance(Duration::from_millis(10)).await;

        assert_eq!(manager.get_data("echo").unwrap(), Some(json!({"page": 1})));
    }

    #[tokio::test]
    async fn test_event_trigger_payload_used_without_args_getter() {
        let mut manager: DataDaemonManager<serde_json::Value, ManualHost> =
            DataDaemonManager::new(ManualHost::new());
        manager
            .add_daemon(DaemonConfig::event("inbox").with_trigger(
                "message",
                EventTrigger::new(fetch_fn(|args| async move { Ok(args.unwrap_or_default()) })),
            ))
            .unwrap();
        manager.start_daemon("inbox").unwrap();

        manager
            .host()
            .emit("message", Some(json!({"id": 9})))
            .await;
        assert_eq!(manager.get_data("inbox").unwrap(), Some(json!({"id": 9})));
    }

    #[tokio::test]
    async fn test_event_daemon_stop_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::event("inbox")
                    .with_trigger("a", EventTrigger::new(counting_fetch(&counter)))
                    .with_trigger("b", EventTrigger::new(counting_fetch(&counter))),
            )
            .unwrap();

        manager.start_daemon("inbox").unwrap();
        manager.start_daemon("inbox").unwrap();
        assert_eq!(manager.host().subscriber_count("a"), 1);
        assert_eq!(manager.host().subscriber_count("b"), 1);

        manager.stop_daemon("inbox").unwrap();
        manager.stop_daemon("inbox").unwrap();
        assert_eq!(manager.host().subscriber_count("a"), 0);
        assert_eq!(manager.host().emit("b", None).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_get_data_without_fetch_function() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::event("inbox")
                    .with_trigger("a", EventTrigger::new(counting_fetch(&counter))),
            )
            .unwrap();

        assert!(matches!(
            manager.force_get_data("inbox"),
            Err(AppError::NoFetchFunction { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer(
                    "flaky",
                    "active",
                    fetch_fn(move |_args| {
                        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                        async move {
                            if n % 2 == 0 {
                                anyhow::bail!("attempt {} failed", n);
                            }
                            Ok(n)
                        }
                    }),
                )
                .with_interval("active", Duration::from_millis(10)),
            )
            .unwrap();

        assert_eq!(manager.force_get_data("flaky").unwrap().await.unwrap(), 1);
        let err = manager.force_get_data("flaky").unwrap().await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert_eq!(manager.get_data("flaky").unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_start_all_isolates_failures() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("broken", "missing", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(10)),
            )
            .unwrap();
        manager
            .add_daemon(
                DaemonConfig::timer("healthy", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(10)),
            )
            .unwrap();

        let err = manager.start_all_daemons().unwrap_err();
        assert!(matches!(err, AppError::PartialStart { ref failed } if failed == &vec!["broken".to_string()]));
        assert!(manager.is_running("healthy").unwrap());
        assert!(!manager.is_running("broken").unwrap());

        manager.stop_all_daemons();
        assert!(manager.host().active_intervals().is_empty());
    }

    #[test]
    fn test_listener_removal_through_manager() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                    .with_interval("active", Duration::from_millis(10)),
            )
            .unwrap();

        let id = manager.add_listener("poll", |_v: usize| {}).unwrap();
        assert_eq!(manager.listener_count("poll").unwrap(), 1);
        manager.remove_listener("poll", id).unwrap();
        manager.remove_listener("poll", id).unwrap();
        assert_eq!(manager.listener_count("poll").unwrap(), 0);
    }

    #[test]
    fn test_drop_stops_running_daemons() {
        let counter = Arc::new(AtomicUsize::new(0));
        let host = ManualHost::new();
        {
            let mut manager = DataDaemonManager::new(host.clone());
            manager
                .add_daemon(
                    DaemonConfig::timer("poll", "active", counting_fetch(&counter))
                        .with_interval("active", Duration::from_millis(10)),
                )
                .unwrap();
            manager.start_all_daemons().unwrap();
            assert_eq!(host.active_intervals().len(), 1);
        }
        assert!(host.active_intervals().is_empty());
    }

    #[test]
    fn test_event_daemon_without_triggers_stays_stopped() {
        let mut manager = manager();
        manager.add_daemon(DaemonConfig::event("quiet")).unwrap();

        manager.start_daemon("quiet").unwrap();
        assert!(!manager.is_running("quiet").unwrap());

        manager.start_all_daemons().unwrap();
        assert!(!manager.is_running("quiet").unwrap());
    }

    #[tokio::test]
    async fn test_reregistering_replaces_without_stopping() {
        let old_counter = Arc::new(AtomicUsize::new(0));
        let new_counter = Arc::new(AtomicUsize::new(0));
        let mut manager = manager();
        manager
            .add_daemon(
                DaemonConfig::timer("d", "active", counting_fetch(&old_counter))
                    .with_interval("active", Duration::from_millis(100)),
            )
            .unwrap();
        manager.start_daemon("d").unwrap();

        manager
            .add_daemon(
                DaemonConfig::timer("d", "active", counting_fetch(&new_counter))
                    .with_interval("active", Duration::from_millis(100)),
            )
            .unwrap();

        assert_eq!(manager.len(), 1);
        assert!(!manager.is_running("d").unwrap());

        // The replaced entry's interval is still registered with the host
        assert_eq!(manager.host().advance(Duration::from_millis(100)).await, 1);
        assert_eq!(old_counter.load(Ordering::SeqCst), 1);
        assert_eq!(new_counter.load(Ordering::SeqCst), 0);
        assert_eq!(manager.get_data("d").unwrap(), None);
    }
}
