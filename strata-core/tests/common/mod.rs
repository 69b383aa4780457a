//! Shared fixtures: a scripted transport and a few model types.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use strata_core::{
    AttributeContainer, AttributeSchema, Client, Endpoint, Envelope, Model, Transport, TransportError,
};

/// One request seen by the stub.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: Endpoint,
    pub body: Value,
}

struct Scripted {
    delay: Duration,
    result: Result<Envelope, TransportError>,
}

/// Replays scripted responses in request order and records every call.
#[derive(Default)]
pub struct StubTransport {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Scripted>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful response whose `data` is `data`.
    pub fn respond(&self, data: Value) {
        self.respond_after(Duration::ZERO, data);
    }

    pub fn respond_after(&self, delay: Duration, data: Value) {
        let envelope = serde_json::from_value(serde_json::json!({ "data": data }))
            .expect("scripted data must be an object");
        self.responses.lock().push_back(Scripted {
            delay,
            result: Ok(envelope),
        });
    }

    pub fn fail(&self, status: u16, message: &str) {
        self.responses.lock().push_back(Scripted {
            delay: Duration::ZERO,
            result: Err(TransportError::with_status(status, message)),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn request(&self, body: Value, endpoint: &Endpoint) -> Result<Envelope, TransportError> {
        self.calls.lock().push(Call {
            endpoint: endpoint.clone(),
            body,
        });
        let scripted = self.responses.lock().pop_front();
        let Some(scripted) = scripted else {
            return Err(TransportError::new("no scripted response"));
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.result
    }
}

pub fn client(stub: &Arc<StubTransport>) -> Arc<Client> {
    Client::new(stub.clone())
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Fully configured REST resource.
pub struct User;

impl Model for User {
    const ENTITY_NAME: &'static str = "user";
    const LIST_NAME: &'static str = "users";

    fn attributes() -> Arc<AttributeSchema> {
        static SCHEMA: OnceLock<Arc<AttributeSchema>> = OnceLock::new();
        SCHEMA
            .get_or_init(|| AttributeSchema::new().attribute("name").attribute("email").into_shared())
            .clone()
    }

    fn get_endpoint() -> Option<Endpoint> {
        Some(Endpoint::get("/users/{id}"))
    }

    fn list_endpoint() -> Option<Endpoint> {
        Some(Endpoint::get("/users"))
    }

    fn post_endpoint() -> Option<Endpoint> {
        Some(Endpoint::post("/users"))
    }

    fn patch_endpoint() -> Option<Endpoint> {
        Some(Endpoint::patch("/users/{id}"))
    }

    fn delete_endpoint() -> Option<Endpoint> {
        Some(Endpoint::delete("/users/{id}"))
    }
}

/// A type with a schema but no endpoints at all.
pub struct Tag;

impl Model for Tag {
    const ENTITY_NAME: &'static str = "tag";

    fn attributes() -> Arc<AttributeSchema> {
        AttributeSchema::new().attribute("label").into_shared()
    }
}

/// A type that forgot its entity name.
pub struct Nameless;

impl Model for Nameless {
    const ENTITY_NAME: &'static str = "";

    fn attributes() -> Arc<AttributeSchema> {
        AttributeSchema::new().into_shared()
    }
}

/// Patches send only the title.
pub struct Note;

impl Model for Note {
    const ENTITY_NAME: &'static str = "note";

    fn attributes() -> Arc<AttributeSchema> {
        AttributeSchema::new()
            .attribute("title")
            .attribute("body")
            .into_shared()
    }

    fn patch_endpoint() -> Option<Endpoint> {
        Some(Endpoint::patch("/notes/{id}"))
    }

    fn prepare_for_patch(data: &AttributeContainer) -> Value {
        let mut body = Map::new();
        body.insert("title".into(), data.get("title").unwrap_or_default());
        Value::Object(body)
    }
}
