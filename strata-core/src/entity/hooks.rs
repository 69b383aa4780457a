//! Lifecycle hooks.
//!
//! Each of get, post, patch and delete has three slots: `before`,
//! `on_success` and `on_error`. Defaults are explicit: `before` and
//! `on_success` do nothing, `on_error` hands the error straight back so
//! the operation fails with it.
//!
//! An error hook that returns `Ok(())` swallows the failure; the operation
//! then resolves to `Ok(None)`.
//!
//! `before` hooks are stored but not yet called by any operation.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{EntityError, Operation, Result};
use crate::transport::Envelope;

pub type BeforeHook = Arc<dyn Fn() + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(&Envelope) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(EntityError) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct HookSet {
    pub before: BeforeHook,
    pub on_success: SuccessHook,
    pub on_error: ErrorHook,
}

impl Default for HookSet {
    fn default() -> Self {
        Self {
            before: Arc::new(|| {}),
            on_success: Arc::new(|_| {}),
            on_error: Arc::new(|err: EntityError| Err(err)),
        }
    }
}

/// Hook configuration for one entity, fixed at construction.
///
/// ```rust,ignore
/// let hooks = Hooks::new()
///     .on_success(Operation::Post, |envelope| info!(?envelope, "created"))
///     .on_any_error(|err| {
///         warn!(%err, "request failed");
///         Ok(())
///     });
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    get: HookSet,
    post: HookSet,
    patch: HookSet,
    delete: HookSet,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks for `operation`. List requests carry no hooks.
    pub fn for_operation(&self, operation: Operation) -> Option<&HookSet> {
        match operation {
            Operation::Get => Some(&self.get),
            Operation::Post => Some(&self.post),
            Operation::Patch => Some(&self.patch),
            Operation::Delete => Some(&self.delete),
            Operation::List => None,
        }
    }

    fn slot_mut(&mut self, operation: Operation) -> Option<&mut HookSet> {
        match operation {
            Operation::Get => Some(&mut self.get),
            Operation::Post => Some(&mut self.post),
            Operation::Patch => Some(&mut self.patch),
            Operation::Delete => Some(&mut self.delete),
            Operation::List => {
                warn!("list requests have no lifecycle hooks; hook ignored");
                None
            }
        }
    }

    pub fn before<F>(mut self, operation: Operation, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Some(slot) = self.slot_mut(operation) {
            slot.before = Arc::new(hook);
        }
        self
    }

    pub fn on_success<F>(mut self, operation: Operation, hook: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        if let Some(slot) = self.slot_mut(operation) {
            slot.on_success = Arc::new(hook);
        }
        self
    }

    pub fn on_error<F>(mut self, operation: Operation, hook: F) -> Self
    where
        F: Fn(EntityError) -> Result<()> + Send + Sync + 'static,
    {
        if let Some(slot) = self.slot_mut(operation) {
            slot.on_error = Arc::new(hook);
        }
        self
    }

    /// Install one success hook on get, post, patch and delete alike.
    pub fn on_any_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let hook: SuccessHook = Arc::new(hook);
        for slot in self.slots_mut() {
            slot.on_success = Arc::clone(&hook);
        }
        self
    }

    /// Install one error hook on get, post, patch and delete alike.
    pub fn on_any_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(EntityError) -> Result<()> + Send + Sync + 'static,
    {
        let hook: ErrorHook = Arc::new(hook);
        for slot in self.slots_mut() {
            slot.on_error = Arc::clone(&hook);
        }
        self
    }

    fn slots_mut(&mut self) -> [&mut HookSet; 4] {
        [
            &mut self.get,
            &mut self.post,
            &mut self.patch,
            &mut self.delete,
        ]
    }

    pub(crate) fn success(&self, operation: Operation, envelope: &Envelope) {
        if let Some(slot) = self.for_operation(operation) {
            (slot.on_success)(envelope);
        }
    }

    pub(crate) fn error(&self, operation: Operation, err: EntityError) -> Result<()> {
        match self.for_operation(operation) {
            Some(slot) => (slot.on_error)(err),
            None => Err(err),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Per-instance options supplied at construction.
#[derive(Debug, Clone, Default)]
pub struct EntityOptions {
    pub hooks: Hooks,
}

impl EntityOptions {
    pub fn with_hooks(hooks: Hooks) -> Self {
        Self { hooks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failure() -> EntityError {
        TransportError::new("boom").into()
    }

    #[test]
    fn default_error_hook_reraises() {
        let hooks = Hooks::new();
        for op in [Operation::Get, Operation::Post, Operation::Patch, Operation::Delete] {
            assert_eq!(hooks.error(op, failure()), Err(failure()));
        }
    }

    #[test]
    fn per_operation_hook_only_affects_its_operation() {
        let hooks = Hooks::new().on_error(Operation::Patch, |_| Ok(()));

        assert_eq!(hooks.error(Operation::Patch, failure()), Ok(()));
        assert!(hooks.error(Operation::Get, failure()).is_err());
    }

    #[test]
    fn any_success_covers_all_four_operations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hooks = Hooks::new().on_any_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let envelope = Envelope::default();
        for op in [Operation::Get, Operation::Post, Operation::Patch, Operation::Delete] {
            hooks.success(op, &envelope);
        }
        hooks.success(Operation::List, &envelope);

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn any_error_overrides_earlier_specific_hooks() {
        let hooks = Hooks::new()
            .on_error(Operation::Get, Err)
            .on_any_error(|_| Ok(()));

        assert_eq!(hooks.error(Operation::Get, failure()), Ok(()));
        assert_eq!(hooks.error(Operation::Delete, failure()), Ok(()));
    }
}
