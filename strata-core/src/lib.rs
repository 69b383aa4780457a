//! Strata Core
//!
//! Reactive, cache-backed models for records that live behind a REST API.
//!
//! - Attribute schemas bound to reactive cells
//! - Entity lifecycle (get, post, patch, delete, restore) with hooks
//! - A query cache that deduplicates reads and carries write responses
//!   into the next read
//!
//! # Architecture
//!
//! - `reactive`: cells, effects and dependency tracking
//! - `schema` / `container`: attribute declarations and per-instance storage
//! - `entity`: the [`Model`] trait and the [`Entity`] lifecycle
//! - `query`: the [`QueryCache`]
//! - `transport`: the [`Transport`] boundary an application implements
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::{Client, Entity};
//!
//! let client = Client::new(Arc::new(HttpTransport::new(base_url)));
//!
//! let user = Entity::<User>::select(client.clone(), 7).await?;
//! user.set_attr("name", "Ann")?;
//! user.patch().await?;
//!
//! // Later reads are served from the patch response, not a new GET.
//! user.fetch_query().await?;
//! ```

pub mod client;
pub mod config;
pub mod container;
pub mod entity;
pub mod error;
pub mod path;
pub mod query;
pub mod reactive;
pub mod schema;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, QueryOptions};
pub use container::AttributeContainer;
pub use entity::{
    find_in_list, find_in_list_by_id, CastSource, Entity, EntityOptions, Hooks, Identified, ListPage, Model,
};
pub use error::{EntityError, Operation, Result, TransportError};
pub use path::{nested_property, set_nested_property};
pub use query::{QueryCache, QueryKey};
pub use reactive::{Effect, ReactiveCell};
pub use schema::{AttributeDescriptor, AttributeSchema};
pub use transport::{Endpoint, Envelope, Method, Transport};
