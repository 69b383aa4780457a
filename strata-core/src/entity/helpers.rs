//! Type-level helpers: select, list, cast and list searches.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Entity, Model};
use crate::client::Client;
use crate::container::{coerce_id, kind_of};
use crate::error::{EntityError, Operation, Result};
use crate::schema::ID;

/// One page of a list request.
pub struct ListPage<M: Model> {
    pub list: Vec<Entity<M>>,
    pub records_total: Option<u64>,
    pub records_filtered: Option<u64>,
}

impl<M: Model> fmt::Debug for ListPage<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPage")
            .field("list", &self.list)
            .field("records_total", &self.records_total)
            .field("records_filtered", &self.records_filtered)
            .finish()
    }
}

/// Anything [`Entity::cast`] accepts.
pub enum CastSource<M: Model> {
    Entity(Entity<M>),
    Value(Value),
}

impl<M: Model> From<Entity<M>> for CastSource<M> {
    fn from(entity: Entity<M>) -> Self {
        Self::Entity(entity)
    }
}

impl<M: Model> From<Value> for CastSource<M> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<M: Model> From<Map<String, Value>> for CastSource<M> {
    fn from(data: Map<String, Value>) -> Self {
        Self::Value(Value::Object(data))
    }
}

impl<M: Model> From<i64> for CastSource<M> {
    fn from(id: i64) -> Self {
        Self::Value(Value::from(id))
    }
}

impl<M: Model> Entity<M> {
    /// Build an entity holding only `id` and load it with a GET.
    pub async fn select(client: Arc<Client>, id: i64) -> Result<Self> {
        let entity = Self::with_id(client, id)?;
        if let Some(payload) = entity.get().await? {
            entity.data().update(&payload)?;
            entity.original().update(&payload)?;
        }
        Ok(entity)
    }

    /// Fetch one page of records. `filters` is sent as the request body
    /// and may also fill `{placeholders}` in the list endpoint URL.
    pub async fn list(client: Arc<Client>, filters: Map<String, Value>) -> Result<ListPage<M>> {
        let endpoint = M::list_endpoint().ok_or(EntityError::EndpointNotConfigured {
            entity: M::ENTITY_NAME,
            operation: Operation::List,
        })?;
        if M::LIST_NAME.is_empty() {
            return Err(EntityError::MissingListName);
        }
        let endpoint = endpoint.resolve(&filters);

        debug!(entity = M::ENTITY_NAME, %endpoint, "list");
        let envelope = client
            .transport()
            .request(Value::Object(filters), &endpoint)
            .await?;

        let list = envelope
            .list(M::LIST_NAME)
            .iter()
            .map(|item| Self::cast(Arc::clone(&client), item.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(ListPage {
            list,
            records_total: envelope.records_total(),
            records_filtered: envelope.records_filtered(),
        })
    }

    /// Coerce `source` into an entity: entities pass through unchanged,
    /// objects become new entities, integers become entities with only
    /// that id.
    pub fn cast(client: Arc<Client>, source: impl Into<CastSource<M>>) -> Result<Self> {
        match source.into() {
            CastSource::Entity(entity) => Ok(entity),
            CastSource::Value(Value::Object(data)) => Self::new(client, data),
            CastSource::Value(value @ Value::Number(_)) => match coerce_id(&value) {
                Ok(Some(id)) => Self::with_id(client, id),
                _ => Err(EntityError::InvalidCastValue {
                    entity: M::ENTITY_NAME,
                    found: "a non-integer number",
                }),
            },
            CastSource::Value(other) => Err(EntityError::InvalidCastValue {
                entity: M::ENTITY_NAME,
                found: kind_of(&other),
            }),
        }
    }
}

/// Things that carry a record identifier.
pub trait Identified {
    fn identifier(&self) -> Option<i64>;
}

impl<M: Model> Identified for Entity<M> {
    fn identifier(&self) -> Option<i64> {
        self.id()
    }
}

impl Identified for Map<String, Value> {
    fn identifier(&self) -> Option<i64> {
        self.get(ID).and_then(|id| coerce_id(id).ok().flatten())
    }
}

impl Identified for Value {
    fn identifier(&self) -> Option<i64> {
        self.as_object().and_then(|map| map.identifier())
    }
}

impl Identified for i64 {
    fn identifier(&self) -> Option<i64> {
        Some(*self)
    }
}

/// First element of `list` with the same identifier as `needle`. Items
/// without an identifier never match.
pub fn find_in_list<'a, T, N>(list: &'a [T], needle: &N) -> Option<&'a T>
where
    T: Identified,
    N: Identified + ?Sized,
{
    find_in_list_by_id(list, needle.identifier()?)
}

/// First element of `list` whose identifier is `id`.
pub fn find_in_list_by_id<T: Identified>(list: &[T], id: i64) -> Option<&T> {
    list.iter().find(|item| item.identifier() == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_plain_objects_by_id() {
        let list = vec![json!({"id": 1}), json!({"id": 2})];

        assert_eq!(find_in_list_by_id(&list, 2), Some(&json!({"id": 2})));
        assert_eq!(find_in_list_by_id(&list, 3), None);
    }

    #[test]
    fn finds_by_needle_identifier() {
        let list = vec![json!({"id": 1, "name": "a"}), json!({"id": "2", "name": "b"})];

        let found = find_in_list(&list, &json!({"id": 2})).map(|v| &v["name"]);
        assert_eq!(found, Some(&json!("b")));
        assert_eq!(find_in_list(&list, &1_i64).map(|v| &v["name"]), Some(&json!("a")));
        assert_eq!(find_in_list(&list, &json!({"name": "a"})), None);
    }

    #[test]
    fn items_without_id_never_match() {
        let list = vec![json!({"id": null}), json!("loose")];
        assert_eq!(find_in_list_by_id(&list, 0), None);
    }
}
