//! Reactive Context
//!
//! Tracks which effect is currently executing so that cell reads can
//! register it as a dependent. The stack is thread-local: an effect only
//! collects the reads made on the thread that runs it.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug)]
struct Frame {
    subscriber: SubscriberId,
    /// Cell ids read while this frame was on top.
    reads: Vec<u64>,
}

/// Guard for one level of the tracking stack; pops its frame on drop, so
/// the stack stays balanced even if the tracked closure panics.
#[must_use = "dropping the guard immediately ends tracking"]
pub struct ReactiveContext {
    subscriber: SubscriberId,
}

impl ReactiveContext {
    /// Start tracking reads on behalf of `subscriber`.
    pub fn enter(subscriber: SubscriberId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                subscriber,
                reads: Vec::new(),
            });
        });
        Self { subscriber }
    }

    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|frame| frame.subscriber))
    }

    /// Record a read of `cell_id` in the innermost frame. Repeated reads of
    /// one cell are recorded once.
    pub fn track_dependency(cell_id: u64) {
        CONTEXT_STACK.with(|stack| {
            if let Some(frame) = stack.borrow_mut().last_mut() {
                if !frame.reads.contains(&cell_id) {
                    frame.reads.push(cell_id);
                }
            }
        });
    }

    /// Cell ids read so far in the innermost frame.
    pub fn get_dependencies() -> Vec<u64> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.reads.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.subscriber, self.subscriber,
                    "tracking frames popped out of order"
                );
            }
        });
    }
}
