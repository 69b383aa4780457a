//! Attribute access on an entity.
//!
//! Declared attributes are reached by name and routed through the live
//! container, so custom accessors and the write-once id rule always apply.
//! Names beginning with `_` are internal and never readable as attributes.
//!
//! Serializing an entity, or formatting it with `{}`, yields exactly its
//! live data.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Entity, Model};
use crate::error::{EntityError, Result};
use crate::reactive::ReactiveCell;

const INTERNAL_PREFIX: char = '_';

impl<M: Model> Entity<M> {
    /// Public value of attribute `name`.
    pub fn attr(&self, name: &str) -> Result<Value> {
        if name.starts_with(INTERNAL_PREFIX) {
            return Err(EntityError::UnknownAttribute {
                entity: M::ENTITY_NAME,
                name: name.to_string(),
            });
        }
        self.data().get(name)
    }

    /// Attribute `name` deserialized into `T`. A `null` attribute reads as
    /// `T`'s null form, so use `Option<T>` for attributes that may be unset.
    pub fn attr_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.attr(name)?;
        serde_json::from_value(value).map_err(|err| EntityError::InvalidAttributeValue {
            entity: M::ENTITY_NAME,
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Write attribute `name` through its public setter.
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.data().set(name, value.into())
    }

    /// Write every declared key of `partial`; other keys are ignored.
    pub fn update(&self, partial: &Map<String, Value>) -> Result<()> {
        self.data().update(partial)
    }

    /// Live data as a plain object.
    pub fn export(&self) -> Map<String, Value> {
        self.data().export()
    }

    /// The reactive cell behind attribute `name`, for subscriptions.
    pub fn cell(&self, name: &str) -> Result<ReactiveCell<Value>> {
        self.data().cell_for(name)
    }

    pub fn id(&self) -> Option<i64> {
        self.data().id()
    }
}

impl<M: Model> Serialize for Entity<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.export().serialize(serializer)
    }
}

impl<M: Model> fmt::Display for Entity<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.export()))
    }
}
