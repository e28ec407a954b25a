//! Data-handling decorator: every fetch function registered with the manager
//! is wrapped so that a successful result is cached on the daemon and
//! broadcast to its listeners.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

use super::config::FetchFn;
use crate::errors::{AppError, AppResult};
use crate::listeners::{Listener, ListenerCollection, ListenerId};

/// State shared between a daemon's registration and its in-flight activations
pub(crate) struct DaemonCell<T> {
    name: String,
    data: RwLock<Option<T>>,
    listeners: Mutex<ListenerCollection<T>>,
}

impl<T: Clone> DaemonCell<T> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(None),
            listeners: Mutex::new(ListenerCollection::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the last fetched value
    pub(crate) fn data(&self) -> Option<T> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, value: T) {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub(crate) fn add_listener(&self, listener: Listener<T>) -> ListenerId {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_listener(listener)
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_listener(id);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Hand every current listener its own copy of `value`.
    ///
    /// The registry is snapshotted first so listeners may add or remove
    /// listeners (or call back into the manager) while being notified.
    fn broadcast(&self, value: &T) -> usize {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();

        for listener in &listeners {
            listener(value.clone());
        }
        listeners.len()
    }
}

/// A fetch function wrapped with cache-and-broadcast behavior
pub(crate) struct DataHandler<T> {
    cell: Arc<DaemonCell<T>>,
    fetch: FetchFn<T>,
}

impl<T> Clone for DataHandler<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<T> fmt::Debug for DataHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHandler")
            .field("daemon", &self.cell.name)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> DataHandler<T> {
    pub(crate) fn new(cell: Arc<DaemonCell<T>>, fetch: FetchFn<T>) -> Self {
        Self { cell, fetch }
    }

    pub(crate) fn daemon_name(&self) -> &str {
        &self.cell.name
    }

    /// Invoke the raw fetch now and return a future that caches and
    /// broadcasts its result.
    ///
    /// A failed fetch leaves the cache untouched and notifies nobody.
    pub(crate) fn call(
        &self,
        args: Option<Value>,
    ) -> impl std::future::Future<Output = AppResult<T>> + Send + 'static {
        let pending = (self.fetch)(args);
        let cell = Arc::clone(&self.cell);

        async move {
            let value = pending
                .await
                .map_err(|e| AppError::fetch(cell.name(), e))?;

            cell.store(value.clone());
            let notified = cell.broadcast(&value);
            debug!("Daemon '{}' broadcast to {} listener(s)", cell.name(), notified);

            Ok(value)
        }
    }
}
