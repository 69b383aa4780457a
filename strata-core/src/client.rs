//! The shared client handle.
//!
//! One `Client` is built at startup and handed to every entity as an
//! `Arc<Client>`. It owns the transport and the process-wide query cache;
//! tests that need isolation build their own client or call
//! [`Client::reset`].

use std::fmt;
use std::sync::Arc;

use crate::config::{ClientConfig, QueryOptions};
use crate::query::QueryCache;
use crate::transport::Transport;

pub struct Client {
    transport: Arc<dyn Transport>,
    cache: Arc<QueryCache>,
    config: ClientConfig,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Arc<Self> {
        Arc::new(Self {
            transport,
            cache: Arc::new(QueryCache::new()),
            config,
        })
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Query options for a type that does not override them.
    pub fn default_query_options(&self) -> QueryOptions {
        self.config.query
    }

    /// Drop every cached query.
    pub fn reset(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("cached_queries", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}
