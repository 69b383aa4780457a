//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a cell
//! it read during its last run is written. It stands in for a UI binding:
//! render an entity field once, and the render repeats after every edit.
//!
//! Each run starts by dropping the previous run's dependencies, then
//! re-tracks the reads it actually makes, so conditional reads behave.
//!
//! A write made by an effect to a cell it depends on does not re-enter the
//! effect while it is still running.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::subscriber::SubscriberId;

struct EffectInner {
    subscriber: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    dependencies: RwLock<HashSet<u64>>,
    running: AtomicBool,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        Runtime::clear_dependencies(self.subscriber);
        let reads = {
            let _ctx = ReactiveContext::enter(self.subscriber);
            (self.run)();
            ReactiveContext::get_dependencies()
        };

        *self.dependencies.write() = reads.into_iter().collect();
        self.run_count.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber
    }

    fn schedule(&self) {
        self.execute();
    }
}

/// A computation that re-runs when the cells it reads change.
///
/// ```rust,ignore
/// let title = entity.cell("title")?;
/// let render = Effect::new(move || draw(title.get()));
///
/// entity.set_attr("title", json!("Draft 2"))?; // draw runs again
/// ```
///
/// Clones share one registration; the effect stops tracking when the last
/// clone is dropped or after [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
    _handle: Arc<ReactiveHandle>,
}

impl Effect {
    /// Create an effect and run it once to collect its dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create an effect without running it; it tracks nothing until the
    /// first [`execute`](Self::execute).
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            subscriber: SubscriberId::new(),
            run: Box::new(run),
            dependencies: RwLock::new(HashSet::new()),
            running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });
        let reactive: Arc<dyn Reactive> = inner.clone();
        let handle = Runtime::register(&reactive);

        Self {
            inner,
            _handle: Arc::new(handle),
        }
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber
    }

    /// Run the effect now, re-collecting dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Stop the effect; later writes and `execute` calls are ignored.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        Runtime::clear_dependencies(self.inner.subscriber);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber", &self.inner.subscriber)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::ReactiveCell;
    use std::sync::atomic::AtomicI64;

    #[test]
    fn effect_runs_on_creation_and_on_write() {
        let cell = ReactiveCell::new(1_i64);
        let seen = Arc::new(AtomicI64::new(0));

        let source = cell.clone();
        let sink = Arc::clone(&seen);
        let effect = Effect::new(move || sink.store(source.get(), Ordering::SeqCst));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(effect.dependency_count(), 1);

        cell.set(5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn lazy_effect_waits_for_execute() {
        let effect = Effect::new_lazy(|| {});
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn disposed_effect_ignores_writes() {
        let cell = ReactiveCell::new(0_i64);
        let source = cell.clone();
        let effect = Effect::new(move || {
            source.get();
        });

        effect.dispose();
        cell.set(1);
        effect.execute();

        assert!(effect.is_disposed());
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn dropped_effect_stops_tracking() {
        let cell = ReactiveCell::new(0_i64);
        let runs = Arc::new(AtomicI64::new(0));

        let source = cell.clone();
        let counter = Arc::clone(&runs);
        let effect = Effect::new(move || {
            source.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(effect);

        cell.set(3);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn self_write_does_not_recurse() {
        let cell = ReactiveCell::new(0_i64);
        let source = cell.clone();
        let effect = Effect::new(move || {
            let v = source.get();
            if v < 100 {
                source.set(v + 1);
            }
        });

        assert_eq!(cell.get_untracked(), 1);
        assert_eq!(effect.run_count(), 1);
    }
}
