//! Entity lifecycle: get, cached fetch, post, patch, delete, restore.
//!
//! Every operation checks its configuration first (endpoint, identifier)
//! and fails fast without touching the transport or the hooks. Transport
//! failures are offered to the operation's error hook; a hook that
//! swallows the failure makes the operation return `Ok(None)`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::{Entity, Model};
use crate::config::QueryOptions;
use crate::error::{EntityError, Operation, Result};
use crate::query::{QueryFn, QueryKey};
use crate::schema::ID;
use crate::transport::{Endpoint, Envelope};

impl<M: Model> Entity<M> {
    /// Fetch this record from the server.
    ///
    /// Returns the entity-keyed payload of the response without applying
    /// it to any container; [`fetch_query`](Self::fetch_query) is the path
    /// that loads data into the entity.
    pub async fn get(&self) -> Result<Option<Map<String, Value>>> {
        let Some(envelope) = self.request_get().await? else {
            return Ok(None);
        };
        self.hooks().success(Operation::Get, &envelope);
        Ok(envelope.entity(M::ENTITY_NAME).cloned())
    }

    /// Read this record through the query cache and load the result into
    /// both the live and the original containers.
    ///
    /// On a cache miss a pending write response (see
    /// [`post`](Self::post)) is consumed instead of issuing a GET. Returns
    /// `Ok(None)` when a swallowed error left nothing to load.
    pub async fn fetch_query(&self) -> Result<Option<Map<String, Value>>> {
        let id = self.require_id(Operation::Get)?;
        let key = QueryKey::new(M::ENTITY_NAME, id);
        let options = self.query_options();

        let loaded = Arc::new(AtomicBool::new(false));
        let value = self
            .client()
            .cache()
            .fetch_query(key, options, self.query_fn(Arc::clone(&loaded)))
            .await?;

        let Value::Object(raw) = value else {
            return Ok(None);
        };
        if !loaded.load(Ordering::SeqCst) {
            trace!(%key, "loading cached query into entity");
            self.apply(&raw)?;
        }
        Ok(Some(raw))
    }

    /// Create this record on the server.
    ///
    /// The response payload is buffered for the next fetch and its id is
    /// assigned to the live data; the cache is then asked to refetch this
    /// entity's key.
    pub async fn post(&self) -> Result<Option<Envelope>> {
        let endpoint = Self::endpoint(Operation::Post, M::post_endpoint())?;
        if let Some(id) = self.id() {
            return Err(EntityError::AlreadyPersisted {
                entity: M::ENTITY_NAME,
                id,
            });
        }

        let body = M::prepare_for_post(self.data());
        let endpoint = endpoint.resolve(&self.data().export());

        debug!(entity = M::ENTITY_NAME, %endpoint, "post");
        let Some(envelope) = self.send(Operation::Post, body, &endpoint).await? else {
            return Ok(None);
        };

        if let Some(payload) = envelope.entity(M::ENTITY_NAME) {
            let id = payload.get(ID).cloned().unwrap_or(Value::Null);
            self.data().set(ID, id)?;
            self.store_refreshed(payload.clone());
        }

        match self.id() {
            Some(id) => {
                self.mark_persisted();
                self.refetch(id).await;
            }
            None => warn!(entity = M::ENTITY_NAME, "post response carried no id"),
        }

        self.hooks().success(Operation::Post, &envelope);
        Ok(Some(envelope))
    }

    /// Send local changes to the server.
    ///
    /// If the response carries the updated record it is buffered and the
    /// cache refetches this entity's key; otherwise nothing is buffered and
    /// no refetch happens.
    pub async fn patch(&self) -> Result<Option<Envelope>> {
        let endpoint = Self::endpoint(Operation::Patch, M::patch_endpoint())?;
        let id = self.require_id(Operation::Patch)?;

        let body = M::prepare_for_patch(self.data());
        let endpoint = endpoint.resolve(&self.data().export());

        debug!(entity = M::ENTITY_NAME, id, %endpoint, "patch");
        let Some(envelope) = self.send(Operation::Patch, body, &endpoint).await? else {
            return Ok(None);
        };

        if let Some(payload) = envelope.entity(M::ENTITY_NAME) {
            self.store_refreshed(payload.clone());
            self.refetch(id).await;
        }

        self.hooks().success(Operation::Patch, &envelope);
        Ok(Some(envelope))
    }

    /// Delete this record on the server and evict it from the cache.
    pub async fn delete(&self) -> Result<Option<Envelope>> {
        let endpoint = Self::endpoint(Operation::Delete, M::delete_endpoint())?;
        let id = self.require_id(Operation::Delete)?;
        let endpoint = endpoint.resolve(&self.data().export());

        debug!(entity = M::ENTITY_NAME, id, %endpoint, "delete");
        let Some(envelope) = self.send(Operation::Delete, Value::Object(Map::new()), &endpoint).await? else {
            return Ok(None);
        };

        self.client().cache().remove_queries(QueryKey::new(M::ENTITY_NAME, id));
        self.hooks().success(Operation::Delete, &envelope);
        Ok(Some(envelope))
    }

    /// Discard unsaved edits: copy the original snapshot back into the
    /// live data. Only a custom setter can make this fail.
    pub fn restore(&self) -> Result<()> {
        trace!(entity = M::ENTITY_NAME, id = ?self.id(), "restore");
        self.data().update(&self.original().export())
    }

    fn endpoint(operation: Operation, endpoint: Option<Endpoint>) -> Result<Endpoint> {
        endpoint.ok_or(EntityError::EndpointNotConfigured {
            entity: M::ENTITY_NAME,
            operation,
        })
    }

    fn require_id(&self, operation: Operation) -> Result<i64> {
        self.id().ok_or(EntityError::MissingIdentifier {
            entity: M::ENTITY_NAME,
            operation,
        })
    }

    async fn send(&self, operation: Operation, body: Value, endpoint: &Endpoint) -> Result<Option<Envelope>> {
        match self.client().transport().request(body, endpoint).await {
            Ok(envelope) => Ok(Some(envelope)),
            Err(err) => {
                debug!(entity = M::ENTITY_NAME, %operation, error = %err, "request failed");
                self.hooks().error(operation, err.into())?;
                warn!(entity = M::ENTITY_NAME, %operation, "request failure swallowed by error hook");
                Ok(None)
            }
        }
    }

    fn query_options(&self) -> QueryOptions {
        M::query_options().unwrap_or_else(|| self.client().default_query_options())
    }

    /// GET without hooks. Marks the entity persisted on success.
    async fn request_get(&self) -> Result<Option<Envelope>> {
        let endpoint = Self::endpoint(Operation::Get, M::get_endpoint())?;
        let id = self.require_id(Operation::Get)?;
        let endpoint = endpoint.resolve(&self.data().export());

        debug!(entity = M::ENTITY_NAME, id, %endpoint, "get");
        let envelope = self.send(Operation::Get, Value::Object(Map::new()), &endpoint).await?;
        if envelope.is_some() {
            self.mark_persisted();
        }
        Ok(envelope)
    }

    /// Re-run this entity's own fetch for its cached query, so the write
    /// response just buffered is the one consumed.
    async fn refetch(&self, id: i64) {
        let key = QueryKey::new(M::ENTITY_NAME, id);
        let fetcher = self.query_fn(Arc::new(AtomicBool::new(false)));
        if let Err(err) = self.client().cache().refetch_with(key, self.query_options(), fetcher).await {
            warn!(%key, error = %err, "refetch after write failed");
        }
    }

    /// The cache-side fetch for this entity. Holds the entity weakly so a
    /// cached query never keeps a dropped entity alive.
    fn query_fn(&self, loaded: Arc<AtomicBool>) -> QueryFn {
        let entity = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let entity = entity.clone();
            let loaded = Arc::clone(&loaded);
            async move {
                let inner = entity
                    .upgrade()
                    .ok_or(EntityError::Detached { entity: M::ENTITY_NAME })?;
                let value = Entity::from_inner(inner).load().await?;
                loaded.store(true, Ordering::SeqCst);
                Ok(value)
            }
            .boxed()
        })
    }

    /// Produce fresh data for the cache: the pending write response merged
    /// over live data if there is one, otherwise a GET.
    async fn load(&self) -> Result<Value> {
        if let Some(refreshed) = self.take_refreshed() {
            trace!(entity = M::ENTITY_NAME, id = ?self.id(), "consuming refreshed payload");
            let mut merged = self.data().export();
            merged.extend(refreshed);

            self.apply(&merged)?;
            self.hooks()
                .success(Operation::Get, &Envelope::for_entity(M::ENTITY_NAME, merged.clone()));
            return Ok(Value::Object(merged));
        }

        let Some(envelope) = self.request_get().await? else {
            return Ok(Value::Null);
        };
        let Some(payload) = envelope.entity(M::ENTITY_NAME).cloned() else {
            warn!(entity = M::ENTITY_NAME, id = ?self.id(), "get response carried no entity payload");
            self.hooks().success(Operation::Get, &envelope);
            return Ok(Value::Null);
        };

        self.apply(&payload)?;
        self.hooks().success(Operation::Get, &envelope);
        Ok(Value::Object(payload))
    }

    /// Load fetched data into both containers.
    fn apply(&self, raw: &Map<String, Value>) -> Result<()> {
        self.data().update(raw)?;
        self.original().update(raw)?;
        if self.id().is_some() {
            self.mark_persisted();
        }
        Ok(())
    }
}
