//! Tokio-backed host: runtime intervals plus an in-process event bus.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::{EventHandler, Host, Tick, Unsubscribe};

#[derive(Default)]
struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<String, Vec<(u64, EventHandler)>>>,
}

impl EventBus {
    fn subscribe(&self, event: &str, handler: EventHandler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn unsubscribe(&self, event: &str, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handlers) = subscribers.get_mut(event) {
            handlers.retain(|(existing, _)| *existing != id);
            if handlers.is_empty() {
                subscribers.remove(event);
            }
        }
    }

    fn handlers(&self, event: &str) -> Vec<EventHandler> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }
}

/// Host that schedules intervals as tokio tasks and dispatches events emitted
/// through [`TokioHost::publish`].
///
/// Every tick and event delivery is spawned as its own task, so a slow fetch
/// never delays the next activation. Must be used from inside a tokio runtime.
#[derive(Clone, Default)]
pub struct TokioHost {
    bus: Arc<EventBus>,
}

impl TokioHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber. Returns how many
    /// handlers were dispatched.
    pub fn publish(&self, event: &str, payload: Option<Value>) -> usize {
        let handlers = self.bus.handlers(event);
        debug!("Publishing event '{}' to {} subscriber(s)", event, handlers.len());

        for handler in &handlers {
            tokio::spawn(handler(payload.clone()));
        }
        handlers.len()
    }

    /// Number of live subscriptions for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.bus.handlers(event).len()
    }
}

impl Host for TokioHost {
    type IntervalHandle = JoinHandle<()>;

    fn start_interval(&self, tick: Tick, delay: Duration) -> Self::IntervalHandle {
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + delay, delay);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                tokio::spawn(tick());
            }
        })
    }

    fn stop_interval(&self, handle: Self::IntervalHandle) {
        handle.abort();
    }

    fn subscribe_to_event(&self, event: &str, handler: EventHandler) -> Unsubscribe {
        let id = self.bus.subscribe(event, handler);
        let bus = Arc::clone(&self.bus);
        let event = event.to_string();

        Box::new(move || bus.unsubscribe(&event, id))
    }
}
