//! Deterministic host driven explicitly by the caller.
//!
//! Nothing happens until [`ManualHost::advance`], [`ManualHost::tick_all`] or
//! [`ManualHost::emit`] is awaited, and each of those runs the resulting work
//! to completion before returning. Useful for embedding the manager in a host
//! that owns its own clock, and for tests.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{EventHandler, Host, Tick, Unsubscribe};

/// Handle for an interval registered with a [`ManualHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualIntervalHandle(u64);

struct ManualInterval {
    tick: Tick,
    delay: Duration,
    elapsed: Duration,
}

#[derive(Default)]
struct ManualState {
    next_id: AtomicU64,
    intervals: Mutex<BTreeMap<u64, ManualInterval>>,
    subscribers: Mutex<BTreeMap<u64, (String, EventHandler)>>,
}

impl ManualState {
    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Clone, Default)]
pub struct ManualHost {
    state: Arc<ManualState>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move every running interval forward by `elapsed`, running each tick
    /// that falls due. Returns the number of ticks run.
    pub async fn advance(&self, elapsed: Duration) -> usize {
        let due: Vec<Tick> = {
            let mut intervals = self
                .state
                .intervals
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut due = Vec::new();

            for interval in intervals.values_mut() {
                if interval.delay.is_zero() {
                    continue;
                }
                interval.elapsed += elapsed;
                while interval.elapsed >= interval.delay {
                    interval.elapsed -= interval.delay;
                    due.push(Arc::clone(&interval.tick));
                }
            }
            due
        };

        for tick in &due {
            tick().await;
        }
        due.len()
    }

    /// Run every running interval's tick once, regardless of elapsed time
    pub async fn tick_all(&self) -> usize {
        let ticks: Vec<Tick> = self
            .state
            .intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|interval| Arc::clone(&interval.tick))
            .collect();

        for tick in &ticks {
            tick().await;
        }
        ticks.len()
    }

    /// Deliver `event` to its subscribers and wait for every handler to finish.
    /// Returns the number of handlers invoked.
    pub async fn emit(&self, event: &str, payload: Option<Value>) -> usize {
        let handlers: Vec<EventHandler> = self
            .state
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &handlers {
            handler(payload.clone()).await;
        }
        handlers.len()
    }

    /// Delays of the currently running intervals, in registration order
    pub fn active_intervals(&self) -> Vec<Duration> {
        self.state
            .intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|interval| interval.delay)
            .collect()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.state
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl Host for ManualHost {
    type IntervalHandle = ManualIntervalHandle;

    fn start_interval(&self, tick: Tick, delay: Duration) -> Self::IntervalHandle {
        let id = self.state.allocate_id();
        self.state
            .intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ManualInterval {
                    tick,
                    delay,
                    elapsed: Duration::ZERO,
                },
            );
        ManualIntervalHandle(id)
    }

    fn stop_interval(&self, handle: Self::IntervalHandle) {
        self.state
            .intervals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
    }

    fn subscribe_to_event(&self, event: &str, handler: EventHandler) -> Unsubscribe {
        let id = self.state.allocate_id();
        self.state
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (event.to_string(), handler));

        let state = Arc::clone(&self.state);
        Box::new(move || {
            state
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
        })
    }
}
