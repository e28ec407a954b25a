//! Listener registry used by each daemon to fan out fetched data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with a private copy of every broadcast value
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Identifier returned by [`ListenerCollection::add_listener`].
///
/// Ids start at 1 and are never reused by the collection that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manages a set of listeners that can be removed by id.
pub struct ListenerCollection<T> {
    listeners: BTreeMap<ListenerId, Listener<T>>,
    next_id: u64,
}

impl<T> ListenerCollection<T> {
    pub fn new() -> Self {
        Self {
            listeners: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Store `listener` under a freshly allocated id
    pub fn add_listener(&mut self, listener: Listener<T>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.insert(id, listener);
        id
    }

    /// Remove the listener registered under `id`. Unknown ids are ignored.
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    /// The live registry, not a copy.
    pub fn listeners(&self) -> &BTreeMap<ListenerId, Listener<T>> {
        &self.listeners
    }

    /// Clone out the current callbacks so they can be invoked without holding
    /// a borrow of the collection.
    pub fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for ListenerCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerCollection")
            .field("ids", &self.listeners.keys().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}
