//! Query caching.
//!
//! Entity reads go through a [`QueryCache`] keyed by [`QueryKey`], so that
//! repeated reads of one record share a single network fetch and write
//! operations can push their responses into the next read.

mod cache;
mod key;

pub use cache::{QueryCache, QueryFn};
pub use key::QueryKey;
