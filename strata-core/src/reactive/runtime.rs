//! Reactive Runtime
//!
//! The runtime connects cells to the effects that read them.
//!
//! 1. An effect registers itself and receives a [`ReactiveHandle`].
//! 2. While the effect runs, every tracked cell read calls
//!    [`Runtime::add_dependency`].
//! 3. When a cell is written, [`Runtime::notify_cell_change`] schedules
//!    every live effect that depends on it.
//!
//! Effects are held weakly: dropping the last handle to an effect removes
//! it from the registry, and a dead weak reference is skipped on notify.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::SubscriberId;

/// Something the runtime can schedule when a dependency changes.
pub trait Reactive: Send + Sync {
    fn subscriber_id(&self) -> SubscriberId;

    /// Re-run in response to a dependency change.
    fn schedule(&self);
}

/// Registration token; unregisters the reactive value on drop.
pub struct ReactiveHandle {
    subscriber: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber);
    }
}

type Dependents = SmallVec<[SubscriberId; 4]>;

static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Reactive>>> = OnceLock::new();
static CELL_DEPENDENTS: OnceLock<DashMap<u64, Dependents>> = OnceLock::new();

fn registry() -> &'static DashMap<SubscriberId, Weak<dyn Reactive>> {
    REGISTRY.get_or_init(DashMap::new)
}

fn cell_dependents() -> &'static DashMap<u64, Dependents> {
    CELL_DEPENDENTS.get_or_init(DashMap::new)
}

/// Process-wide coordinator for cells and effects.
pub struct Runtime;

impl Runtime {
    pub fn register(reactive: &Arc<dyn Reactive>) -> ReactiveHandle {
        let subscriber = reactive.subscriber_id();
        registry().insert(subscriber, Arc::downgrade(reactive));
        ReactiveHandle { subscriber }
    }

    fn unregister(subscriber: SubscriberId) {
        registry().remove(&subscriber);
        Self::clear_dependencies(subscriber);
    }

    /// Record that `subscriber` read cell `cell_id`.
    pub fn add_dependency(cell_id: u64, subscriber: SubscriberId) {
        let mut dependents = cell_dependents().entry(cell_id).or_default();
        if !dependents.contains(&subscriber) {
            dependents.push(subscriber);
        }
    }

    /// Forget every cell `subscriber` depends on. Called before an effect
    /// re-runs so that stale reads stop triggering it.
    pub fn clear_dependencies(subscriber: SubscriberId) {
        cell_dependents().retain(|_, dependents| {
            dependents.retain(|s| *s != subscriber);
            !dependents.is_empty()
        });
    }

    /// Schedule every live dependent of `cell_id`.
    pub fn notify_cell_change(cell_id: u64) {
        let subscribers: Dependents = match cell_dependents().get(&cell_id) {
            Some(dependents) => dependents.clone(),
            None => return,
        };

        let due: Vec<Arc<dyn Reactive>> = subscribers
            .iter()
            .filter_map(|id| registry().get(id).and_then(|weak| weak.upgrade()))
            .collect();

        for reactive in due {
            reactive.schedule();
        }
    }

    /// Number of subscribers currently depending on `cell_id`.
    pub fn dependent_count(cell_id: u64) -> usize {
        cell_dependents()
            .get(&cell_id)
            .map_or(0, |dependents| dependents.len())
    }

    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        id: SubscriberId,
        runs: AtomicUsize,
    }

    impl Reactive for Probe {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn schedule(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe() -> Arc<Probe> {
        Arc::new(Probe {
            id: SubscriberId::new(),
            runs: AtomicUsize::new(0),
        })
    }

    #[test]
    fn notify_schedules_registered_dependents() {
        let probe = probe();
        let reactive: Arc<dyn Reactive> = probe.clone();
        let _handle = Runtime::register(&reactive);

        Runtime::add_dependency(u64::MAX - 1, probe.id);
        Runtime::add_dependency(u64::MAX - 1, probe.id);
        Runtime::notify_cell_change(u64::MAX - 1);

        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert_eq!(Runtime::dependent_count(u64::MAX - 1), 1);
    }

    #[test]
    fn dropping_the_handle_unregisters() {
        let probe = probe();
        let reactive: Arc<dyn Reactive> = probe.clone();
        let handle = Runtime::register(&reactive);
        Runtime::add_dependency(u64::MAX - 2, probe.id);

        drop(handle);
        Runtime::notify_cell_change(u64::MAX - 2);

        assert_eq!(probe.runs.load(Ordering::SeqCst), 0);
        assert_eq!(Runtime::dependent_count(u64::MAX - 2), 0);
    }
}
