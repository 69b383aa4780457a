//! Attribute Container
//!
//! The per-instance store behind an entity: one [`ReactiveCell`] per
//! attribute declared in the type's [`AttributeSchema`], all starting at
//! `null`. Reads and writes go through the schema's accessors, so custom
//! getters and setters apply whether a value arrives one field at a time
//! or through a bulk [`update`](AttributeContainer::update).
//!
//! The identifier is special: whatever the schema says, `id` is coerced to
//! an integer and, once non-null, silently refuses further writes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{EntityError, Result};
use crate::reactive::ReactiveCell;
use crate::schema::{AttributeSchema, ID};

pub struct AttributeContainer {
    /// Entity type name of the owner. The container never owns its entity.
    owner: &'static str,
    schema: Arc<AttributeSchema>,
    cells: IndexMap<String, ReactiveCell<Value>>,
}

impl AttributeContainer {
    pub fn new(owner: &'static str, schema: Arc<AttributeSchema>) -> Self {
        let cells = schema
            .names()
            .map(|name| (name.to_string(), ReactiveCell::new(Value::Null)))
            .collect();

        Self {
            owner,
            schema,
            cells,
        }
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn schema(&self) -> &Arc<AttributeSchema> {
        &self.schema
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Public value of `name`, through the custom getter if one is declared.
    pub fn get(&self, name: &str) -> Result<Value> {
        let cell = self.cell(name)?;
        Ok(self.read(name, cell))
    }

    /// Write `value` through the public setter of `name`.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let cell = self.cell(name)?;
        if name == ID {
            return self.assign_id(cell, value);
        }

        match self.schema.descriptor(name).and_then(|d| d.set.as_ref()) {
            Some(setter) => setter(self, value),
            None => {
                cell.set(value);
                Ok(())
            }
        }
    }

    /// Raw cell value of `name`, bypassing any custom getter. Meant for
    /// custom accessors reading sibling attributes.
    pub fn raw(&self, name: &str) -> Result<Value> {
        Ok(self.cell(name)?.get())
    }

    /// Write the cell of `name` directly, bypassing any custom setter. The
    /// write-once identifier rule still applies.
    pub fn write_raw(&self, name: &str, value: Value) -> Result<()> {
        let cell = self.cell(name)?;
        if name == ID {
            return self.assign_id(cell, value);
        }
        cell.set(value);
        Ok(())
    }

    /// Write every declared key of `partial` through its public setter.
    /// Undeclared keys are skipped.
    pub fn update(&self, partial: &Map<String, Value>) -> Result<()> {
        for (name, value) in partial {
            if self.contains(name) {
                self.set(name, value.clone())?;
            } else {
                trace!(entity = self.owner, attribute = %name, "ignoring undeclared attribute");
            }
        }
        Ok(())
    }

    /// Snapshot of every attribute's public value, in schema order.
    pub fn export(&self) -> Map<String, Value> {
        self.cells
            .iter()
            .map(|(name, cell)| (name.clone(), self.read(name, cell)))
            .collect()
    }

    /// Handle to the cell backing `name`, for direct subscription.
    pub fn cell_for(&self, name: &str) -> Result<ReactiveCell<Value>> {
        self.cell(name).cloned()
    }

    /// Current identifier, if one has been assigned.
    pub fn id(&self) -> Option<i64> {
        self.cells.get(ID).and_then(|cell| cell.with(Value::as_i64))
    }

    fn cell(&self, name: &str) -> Result<&ReactiveCell<Value>> {
        self.cells
            .get(name)
            .ok_or_else(|| EntityError::UnknownAttribute {
                entity: self.owner,
                name: name.to_string(),
            })
    }

    fn read(&self, name: &str, cell: &ReactiveCell<Value>) -> Value {
        match self.schema.descriptor(name).and_then(|d| d.get.as_ref()) {
            Some(getter) => getter(self, &cell.get()),
            None => cell.get(),
        }
    }

    fn assign_id(&self, cell: &ReactiveCell<Value>, value: Value) -> Result<()> {
        if !cell.with(Value::is_null) {
            trace!(entity = self.owner, "id already assigned; ignoring write");
            return Ok(());
        }

        let id = coerce_id(&value).map_err(|reason| EntityError::InvalidAttributeValue {
            entity: self.owner,
            name: ID.to_string(),
            reason,
        })?;

        if let Some(id) = id {
            cell.set(Value::from(id));
        }
        Ok(())
    }
}

/// Coerce an incoming identifier to an integer. `null` means "no id".
pub(crate) fn coerce_id(value: &Value) -> std::result::Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(id) = n.as_i64() {
                return Ok(Some(id));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(Some(f as i64))
                }
                _ => Err(format!("{n} is not an integer")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{s:?} is not an integer")),
        other => Err(format!("expected an integer, found {}", kind_of(other))),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Debug for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeContainer")
            .field("owner", &self.owner)
            .field("data", &self.export())
            .finish()
    }
}
