//! Reactive Primitives
//!
//! Every entity attribute lives in a [`ReactiveCell`]. Code that wants to
//! follow an attribute either subscribes a callback on the cell directly or
//! wraps its reads in an [`Effect`], which re-runs automatically after any
//! cell it read is written.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic: a thread-local [`ReactiveContext`]
//! records which effect is running, and each tracked cell read registers
//! that effect with the global [`Runtime`]. Writes notify local listeners
//! first, then the runtime.

mod cell;
mod context;
mod effect;
mod runtime;
mod subscriber;

pub use cell::ReactiveCell;
pub use context::ReactiveContext;
pub use effect::Effect;
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use subscriber::SubscriberId;
