//! Transport boundary.
//!
//! The crate never speaks HTTP itself. An application supplies a
//! [`Transport`] that turns a JSON body and an [`Endpoint`] into a response
//! [`Envelope`]; entity operations build the body and read the envelope.
//!
//! Endpoint URLs may carry `{path}` placeholders, filled from the entity's
//! exported attributes before the call: `/users/{id}` or
//! `/teams/{team.id}/members/{id}`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::path::nested_property;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        })
    }
}

/// Where and how to send one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: Method,
    pub url: String,
}

impl Endpoint {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Copy of this endpoint with `{path}` placeholders replaced by values
    /// from `params`. Strings are inserted bare, other values as JSON.
    /// Placeholders that resolve to nothing (or `null`) are left in place.
    pub fn resolve(&self, params: &Map<String, Value>) -> Self {
        let root = Value::Object(params.clone());
        let mut url = String::with_capacity(self.url.len());
        let mut rest = self.url.as_str();

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            url.push_str(&rest[..open]);

            let token = &rest[open + 1..close];
            match nested_property(&root, token) {
                Some(Value::String(s)) => url.push_str(s),
                Some(Value::Null) | None => url.push_str(&rest[open..=close]),
                Some(other) => url.push_str(&other.to_string()),
            }
            rest = &rest[close + 1..];
        }
        url.push_str(rest);

        Self {
            method: self.method,
            url,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Response body: `{ "data": { ... } }`.
///
/// Single-entity operations key the payload by entity name
/// (`{"data": {"user": {...}}}`); lists key an array by list name and may
/// carry `recordsTotal` / `recordsFiltered`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Envelope {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Wrap a single entity payload under `entity_name`.
    pub fn for_entity(entity_name: &str, payload: Map<String, Value>) -> Self {
        let mut data = Map::new();
        data.insert(entity_name.to_string(), Value::Object(payload));
        Self { data }
    }

    /// The object stored under `entity_name`, if there is one.
    pub fn entity(&self, entity_name: &str) -> Option<&Map<String, Value>> {
        self.data.get(entity_name).and_then(Value::as_object)
    }

    /// The array stored under `list_name`; empty when absent.
    pub fn list(&self, list_name: &str) -> &[Value] {
        self.data
            .get(list_name)
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn records_total(&self) -> Option<u64> {
        self.data.get("recordsTotal").and_then(Value::as_u64)
    }

    pub fn records_filtered(&self) -> Option<u64> {
        self.data.get("recordsFiltered").and_then(Value::as_u64)
    }
}

/// Issues requests on behalf of entities.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, body: Value, endpoint: &Endpoint) -> Result<Envelope, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn resolves_placeholders_from_attributes() {
        let endpoint = Endpoint::get("/teams/{team.slug}/users/{id}");
        let resolved = endpoint.resolve(&params(json!({"id": 7, "team": {"slug": "core"}})));

        assert_eq!(resolved.url, "/teams/core/users/7");
        assert_eq!(resolved.method, Method::Get);
    }

    #[test]
    fn unresolved_placeholders_stay_put() {
        let endpoint = Endpoint::patch("/users/{id}/{missing}");
        let resolved = endpoint.resolve(&params(json!({"id": null})));

        assert_eq!(resolved.url, "/users/{id}/{missing}");
    }

    #[test]
    fn unterminated_brace_is_copied_verbatim() {
        let endpoint = Endpoint::get("/search?q={id");
        let resolved = endpoint.resolve(&params(json!({"id": 1})));
        assert_eq!(resolved.url, "/search?q={id");
    }

    #[test]
    fn envelope_exposes_entity_and_list_payloads() {
        let envelope: Envelope = serde_json::from_value(json!({
            "data": {
                "user": {"id": 1},
                "users": [{"id": 1}, {"id": 2}],
                "recordsTotal": 40,
                "recordsFiltered": 2
            }
        }))
        .unwrap();

        assert_eq!(envelope.entity("user").unwrap()["id"], json!(1));
        assert!(envelope.entity("users").is_none());
        assert_eq!(envelope.list("users").len(), 2);
        assert!(envelope.list("teams").is_empty());
        assert_eq!(envelope.records_total(), Some(40));
        assert_eq!(envelope.records_filtered(), Some(2));
    }

    #[test]
    fn missing_data_deserializes_empty() {
        let envelope: Envelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.data.is_empty());
    }
}
