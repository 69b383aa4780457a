//! Reactive Cell
//!
//! A `ReactiveCell` is the storage unit behind every entity attribute. It
//! holds one value and notifies two audiences when that value is written:
//!
//! 1. Local subscribers registered with [`ReactiveCell::subscribe`]. These
//!    are plain callbacks, typically a UI binding that re-renders a field.
//!
//! 2. The global [`Runtime`], which re-runs any [`Effect`](super::Effect)
//!    that read the cell while it was executing.
//!
//! Notification is synchronous: by the time `set` returns every subscriber
//! has observed the new value.
//!
//! # Sharing
//!
//! Cloning a cell clones the handle, not the value. All clones read and
//! write the same slot and share one subscriber list.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::SubscriberId;

static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A single observable value.
///
/// ```rust,ignore
/// let name = ReactiveCell::new(Value::Null);
/// let id = name.subscribe(|v| println!("name is now {v}"));
///
/// name.set(json!("Ann")); // prints: name is now "Ann"
/// name.unsubscribe(id);
/// ```
pub struct ReactiveCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: u64,
    value: Arc<RwLock<T>>,
    listeners: Arc<RwLock<Vec<(SubscriberId, Listener<T>)>>>,
}

impl<T> ReactiveCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            id: next_cell_id(),
            value: Arc::new(RwLock::new(value)),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Unique id shared by all clones of this cell.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read the value, registering the running effect (if any) as a
    /// dependent of this cell.
    pub fn get(&self) -> T {
        if let Some(subscriber) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.id);
            Runtime::add_dependency(self.id, subscriber);
        }
        self.value.read().clone()
    }

    /// Read the value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Run `f` against the value in place, without cloning and without
    /// tracking.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Write a new value and notify every subscriber.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.notify();
    }

    /// Derive the next value from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.read());
        self.set(next);
    }

    /// Register a callback invoked with the new value after every write.
    pub fn subscribe<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a callback registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, subscriber: SubscriberId) {
        self.listeners.write().retain(|(id, _)| *id != subscriber);
    }

    /// Number of local subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self) {
        // Snapshot both the value and the listener list so callbacks may
        // read, write, or subscribe to this cell without deadlocking.
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        if !listeners.is_empty() {
            let current = self.get_untracked();
            for listener in listeners {
                listener(&current);
            }
        }

        Runtime::notify_cell_change(self.id);
    }
}

impl<T> Clone for ReactiveCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> Debug for ReactiveCell<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
