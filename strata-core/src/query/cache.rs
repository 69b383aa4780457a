//! Query Cache
//!
//! Every key owns a slot guarded by an async mutex. A fetch holds the slot
//! lock while its fetch function runs, so concurrent `fetch_query` calls
//! for one key wait for the first and then read its result instead of
//! fetching again.
//!
//! A slot remembers the last fetch function it was given. That is what lets
//! [`QueryCache::refetch_queries`] and [`QueryCache::window_focused`]
//! re-run a query without a caller supplying the function again.
//!
//! Fetch functions must not call back into the cache for their own key;
//! the slot lock is not reentrant.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::key::QueryKey;
use crate::config::QueryOptions;
use crate::error::Result;

/// A re-runnable fetch producing the value stored under a key.
pub type QueryFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

#[derive(Default)]
struct Slot {
    value: Option<Value>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    options: QueryOptions,
    fetcher: Option<QueryFn>,
}

impl Slot {
    fn is_fresh(&self) -> bool {
        match (&self.value, self.fetched_at) {
            (Some(_), Some(at)) => !self.invalidated && at.elapsed() < self.options.stale_time,
            _ => false,
        }
    }

    /// A `null` result means the fetch produced nothing; it is handed back
    /// to the caller but never cached, so the next fetch tries again.
    fn store(&mut self, value: Value) {
        if value.is_null() {
            self.invalidated = true;
            return;
        }
        self.value = Some(value);
        self.fetched_at = Some(Instant::now());
        self.invalidated = false;
    }
}

/// Key-addressed, deduplicating store of fetched entity data.
#[derive(Default)]
pub struct QueryCache {
    slots: DashMap<QueryKey, Arc<Mutex<Slot>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: QueryKey) -> Arc<Mutex<Slot>> {
        Arc::clone(&self.slots.entry(key).or_default())
    }

    fn existing(&self, key: &QueryKey) -> Option<Arc<Mutex<Slot>>> {
        self.slots.get(key).map(|slot| Arc::clone(&slot))
    }

    /// Return the cached value for `key` if it is fresh, otherwise run
    /// `fetcher`, store its result, and return that.
    pub async fn fetch_query(&self, key: QueryKey, options: QueryOptions, fetcher: QueryFn) -> Result<Value> {
        let slot = self.slot(key);
        let mut slot = slot.lock().await;
        slot.options = options;
        slot.fetcher = Some(Arc::clone(&fetcher));

        if slot.is_fresh() {
            trace!(%key, "query cache hit");
            if let Some(value) = &slot.value {
                return Ok(value.clone());
            }
        }

        let value = run(key, &fetcher, options.retry).await?;
        slot.store(value.clone());
        Ok(value)
    }

    /// Re-run the stored fetch function for `key`, if the key has one.
    /// Returns `Ok(None)` for keys that were never fetched.
    pub async fn refetch_queries(&self, key: QueryKey) -> Result<Option<Value>> {
        let Some(slot) = self.existing(&key) else {
            trace!(%key, "refetch skipped: no cached query");
            return Ok(None);
        };
        let mut slot = slot.lock().await;
        let Some(fetcher) = slot.fetcher.clone() else {
            return Ok(None);
        };

        debug!(%key, "refetching query");
        let value = run(key, &fetcher, slot.options.retry).await?;
        slot.store(value.clone());
        Ok(Some(value))
    }

    /// Make `fetcher` the stored fetch function for `key` and re-run it.
    ///
    /// Keys that were never fetched are left alone and yield `Ok(None)`. A
    /// failed run marks the entry stale so the old value is not served as
    /// fresh.
    pub async fn refetch_with(&self, key: QueryKey, options: QueryOptions, fetcher: QueryFn) -> Result<Option<Value>> {
        let Some(slot) = self.existing(&key) else {
            trace!(%key, "refetch skipped: no cached query");
            return Ok(None);
        };
        let mut slot = slot.lock().await;
        slot.options = options;
        slot.fetcher = Some(Arc::clone(&fetcher));

        debug!(%key, "refetching query with new fetch function");
        match run(key, &fetcher, options.retry).await {
            Ok(value) => {
                slot.store(value.clone());
                Ok(Some(value))
            }
            Err(err) => {
                slot.invalidated = true;
                Err(err)
            }
        }
    }

    /// Evict `key`. Returns whether an entry existed.
    pub fn remove_queries(&self, key: QueryKey) -> bool {
        let removed = self.slots.remove(&key).is_some();
        if removed {
            debug!(%key, "query removed");
        }
        removed
    }

    /// Mark `key` stale so the next `fetch_query` runs its fetch function.
    pub async fn invalidate_queries(&self, key: QueryKey) {
        if let Some(slot) = self.existing(&key) {
            slot.lock().await.invalidated = true;
        }
    }

    /// Cached value for `key`, fresh or not.
    pub async fn get_query_data(&self, key: QueryKey) -> Option<Value> {
        let slot = self.existing(&key)?;
        let slot = slot.lock().await;
        slot.value.clone()
    }

    /// Refetch every stale entry whose options ask for refetch on focus.
    /// Returns how many entries were refetched; failures are logged and
    /// leave the old value in place.
    pub async fn window_focused(&self) -> usize {
        let slots: Vec<(QueryKey, Arc<Mutex<Slot>>)> = self
            .slots
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut refetched = 0;
        for (key, slot) in slots {
            let mut slot = slot.lock().await;
            if !slot.options.refetch_on_window_focus || slot.is_fresh() {
                continue;
            }
            let Some(fetcher) = slot.fetcher.clone() else {
                continue;
            };
            match run(key, &fetcher, slot.options.retry).await {
                Ok(value) => {
                    slot.store(value);
                    refetched += 1;
                }
                Err(err) => warn!(%key, error = %err, "focus refetch failed"),
            }
        }
        refetched
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.clear();
    }
}

async fn run(key: QueryKey, fetcher: &QueryFn, retry: u32) -> Result<Value> {
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retry => {
                attempt += 1;
                warn!(%key, attempt, error = %err, "query failed; retrying");
            }
            Err(err) => return Err(err),
        }
    }
}
