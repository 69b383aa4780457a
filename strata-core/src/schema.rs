//! Attribute Schema
//!
//! A schema lists the attributes an entity type exposes, in declaration
//! order, and optionally replaces the default accessors of an attribute.
//!
//! ```rust,ignore
//! let schema = AttributeSchema::new()
//!     .attribute("first_name")
//!     .attribute("last_name")
//!     .with_accessors(
//!         "full_name",
//!         AttributeDescriptor::new().get(|data, _raw| {
//!             let first = data.raw("first_name").unwrap_or_default();
//!             let last = data.raw("last_name").unwrap_or_default();
//!             json!(format!("{} {}", first.as_str().unwrap_or(""), last.as_str().unwrap_or("")))
//!         }),
//!     );
//! ```
//!
//! Every schema contains `id`; [`AttributeSchema::new`] declares it first.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::container::AttributeContainer;
use crate::error::Result;

/// Name of the identifier attribute.
pub const ID: &str = "id";

/// Custom read: receives the container (for sibling access) and the raw
/// cell value, returns the public value.
pub type Getter = Arc<dyn Fn(&AttributeContainer, &Value) -> Value + Send + Sync>;

/// Custom write: receives the container and the incoming public value and
/// decides what, if anything, to store.
pub type Setter = Arc<dyn Fn(&AttributeContainer, Value) -> Result<()> + Send + Sync>;

/// Optional accessor overrides for one attribute.
#[derive(Clone, Default)]
pub struct AttributeDescriptor {
    pub(crate) get: Option<Getter>,
    pub(crate) set: Option<Setter>,
}

impl AttributeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<F>(mut self, getter: F) -> Self
    where
        F: Fn(&AttributeContainer, &Value) -> Value + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(getter));
        self
    }

    pub fn set<F>(mut self, setter: F) -> Self
    where
        F: Fn(&AttributeContainer, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(setter));
        self
    }

    pub fn has_custom_get(&self) -> bool {
        self.get.is_some()
    }

    pub fn has_custom_set(&self) -> bool {
        self.set.is_some()
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("get", &self.get.as_ref().map(|_| "custom"))
            .field("set", &self.set.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Ordered attribute declarations for one entity type.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    attributes: IndexMap<String, AttributeDescriptor>,
}

impl AttributeSchema {
    /// A schema declaring only `id`.
    pub fn new() -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert(ID.to_string(), AttributeDescriptor::default());
        Self { attributes }
    }

    /// Declare an attribute with default accessors. Re-declaring an
    /// existing name keeps its position and resets its accessors.
    pub fn attribute(self, name: impl Into<String>) -> Self {
        self.with_accessors(name, AttributeDescriptor::default())
    }

    /// Declare an attribute with custom accessors. For `id`, a custom
    /// setter is ignored: the identifier is always write-once.
    pub fn with_accessors(mut self, name: impl Into<String>, descriptor: AttributeDescriptor) -> Self {
        self.attributes.insert(name.into(), descriptor);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_always_declared_first() {
        let schema = AttributeSchema::new().attribute("name").attribute("email");
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["id", "name", "email"]);
    }

    #[test]
    fn redeclaring_keeps_position() {
        let schema = AttributeSchema::new()
            .attribute("name")
            .attribute("email")
            .with_accessors("name", AttributeDescriptor::new().get(|_, raw| raw.clone()));

        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["id", "name", "email"]);
        assert!(schema.descriptor("name").unwrap().has_custom_get());
        assert!(!schema.descriptor("email").unwrap().has_custom_get());
    }
}
