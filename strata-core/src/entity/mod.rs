//! Entities
//!
//! An [`Entity`] is one remote record of a [`Model`] type. It keeps three
//! views of the record's data:
//!
//! - **live**: the reactive container callers read and edit;
//! - **original**: the container as of the last construction or fetch,
//!   used by [`Entity::restore`];
//! - **refreshed**: a one-shot buffer holding the payload of the last
//!   post/patch, consumed by the next cache fetch instead of a GET.
//!
//! # State
//!
//! An entity is *persisted* once it is known to exist server-side: it was
//! built with an id, or a post/fetch completed. Because the id is
//! write-once, a persisted entity stays persisted.
//!
//! # Concurrency
//!
//! Operations on one entity are not serialized. Two writes in flight at
//! once complete in either order and the later one wins for any attribute
//! both touch. The refreshed buffer has a single slot: a second write that
//! lands before the first one's buffer is consumed replaces it.

mod facade;
mod helpers;
mod hooks;
mod lifecycle;

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::config::QueryOptions;
use crate::container::AttributeContainer;
use crate::error::{EntityError, Result};
use crate::query::QueryKey;
use crate::schema::AttributeSchema;
use crate::transport::Endpoint;

pub use helpers::{find_in_list, find_in_list_by_id, CastSource, Identified, ListPage};
pub use hooks::{BeforeHook, EntityOptions, ErrorHook, HookSet, Hooks, SuccessHook};

/// Type-level configuration of an entity.
///
/// ```rust,ignore
/// struct User;
///
/// impl Model for User {
///     const ENTITY_NAME: &'static str = "user";
///     const LIST_NAME: &'static str = "users";
///
///     fn attributes() -> Arc<AttributeSchema> {
///         static SCHEMA: OnceLock<Arc<AttributeSchema>> = OnceLock::new();
///         SCHEMA
///             .get_or_init(|| AttributeSchema::new().attribute("name").into_shared())
///             .clone()
///     }
///
///     fn get_endpoint() -> Option<Endpoint> {
///         Some(Endpoint::get("/users/{id}"))
///     }
/// }
/// ```
///
/// Endpoints are resolved on every call, so they may depend on session
/// state. An operation whose endpoint is `None` fails with
/// [`EntityError::EndpointNotConfigured`].
pub trait Model: Send + Sync + 'static {
    /// Key of single-entity payloads in response envelopes.
    const ENTITY_NAME: &'static str;

    /// Key of the item array in list responses.
    const LIST_NAME: &'static str = "";

    /// The attribute schema, shared by every instance.
    fn attributes() -> Arc<AttributeSchema>;

    fn get_endpoint() -> Option<Endpoint> {
        None
    }

    fn list_endpoint() -> Option<Endpoint> {
        None
    }

    fn post_endpoint() -> Option<Endpoint> {
        None
    }

    fn patch_endpoint() -> Option<Endpoint> {
        None
    }

    fn delete_endpoint() -> Option<Endpoint> {
        None
    }

    /// Cache behaviour for this type; `None` uses the client defaults.
    fn query_options() -> Option<QueryOptions> {
        None
    }

    /// Request body for a post.
    fn prepare_for_post(data: &AttributeContainer) -> Value {
        Value::Object(data.export())
    }

    /// Request body for a patch.
    fn prepare_for_patch(data: &AttributeContainer) -> Value {
        Value::Object(data.export())
    }
}

pub(crate) struct EntityInner<M: Model> {
    client: Arc<Client>,
    live: AttributeContainer,
    original: AttributeContainer,
    persisted: AtomicBool,
    refreshed: Mutex<Option<Map<String, Value>>>,
    hooks: Hooks,
    _model: PhantomData<fn() -> M>,
}

/// Handle to one record. Clones share the same record.
pub struct Entity<M: Model> {
    inner: Arc<EntityInner<M>>,
}

impl<M: Model> Entity<M> {
    /// Build an entity from initial data. Undeclared keys are ignored; an
    /// `id` makes the entity persisted without any request.
    pub fn new(client: Arc<Client>, data: Map<String, Value>) -> Result<Self> {
        Self::with_options(client, data, EntityOptions::default())
    }

    /// An entity with every attribute null.
    pub fn empty(client: Arc<Client>) -> Result<Self> {
        Self::new(client, Map::new())
    }

    /// An entity carrying only `id`.
    pub fn with_id(client: Arc<Client>, id: i64) -> Result<Self> {
        let mut data = Map::new();
        data.insert(crate::schema::ID.to_string(), Value::from(id));
        Self::new(client, data)
    }

    pub fn with_options(client: Arc<Client>, data: Map<String, Value>, options: EntityOptions) -> Result<Self> {
        if M::ENTITY_NAME.is_empty() {
            return Err(EntityError::MissingEntityName);
        }

        let schema = M::attributes();
        let live = AttributeContainer::new(M::ENTITY_NAME, Arc::clone(&schema));
        live.update(&data)?;
        let persisted = live.id().is_some();

        let original = AttributeContainer::new(M::ENTITY_NAME, schema);
        original.update(&live.export())?;

        debug!(entity = M::ENTITY_NAME, id = ?live.id(), persisted, "entity created");

        Ok(Self {
            inner: Arc::new(EntityInner {
                client,
                live,
                original,
                persisted: AtomicBool::new(persisted),
                refreshed: Mutex::new(None),
                hooks: options.hooks,
                _model: PhantomData,
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<EntityInner<M>>) -> Self {
        Self { inner }
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.inner.client
    }

    /// The live container.
    pub fn data(&self) -> &AttributeContainer {
        &self.inner.live
    }

    /// The snapshot taken at construction or by the last fetch.
    pub fn original(&self) -> &AttributeContainer {
        &self.inner.original
    }

    pub fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    pub fn is_persisted(&self) -> bool {
        self.inner.persisted.load(Ordering::SeqCst)
    }

    /// Whether a write response is waiting to be consumed by a fetch.
    pub fn has_refreshed(&self) -> bool {
        self.inner.refreshed.lock().is_some()
    }

    /// Whether live data differs from the original snapshot.
    pub fn is_dirty(&self) -> bool {
        self.inner.live.export() != self.inner.original.export()
    }

    /// Cache key of this entity, once it has an id.
    pub fn query_key(&self) -> Option<QueryKey> {
        self.id().map(|id| QueryKey::new(M::ENTITY_NAME, id))
    }

    /// Whether both handles refer to the same record instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn mark_persisted(&self) {
        self.inner.persisted.store(true, Ordering::SeqCst);
    }

    fn store_refreshed(&self, payload: Map<String, Value>) {
        let replaced = self.inner.refreshed.lock().replace(payload);
        if replaced.is_some() {
            debug!(entity = M::ENTITY_NAME, id = ?self.id(), "unconsumed refreshed payload replaced");
        }
    }

    fn take_refreshed(&self) -> Option<Map<String, Value>> {
        self.inner.refreshed.lock().take()
    }
}

impl<M: Model> Clone for Entity<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Model> fmt::Debug for Entity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &M::ENTITY_NAME)
            .field("data", &self.inner.live.export())
            .field("persisted", &self.is_persisted())
            .field("refreshed", &self.has_refreshed())
            .finish()
    }
}
