//! Client configuration.
//!
//! Durations are expressed in milliseconds on the wire:
//!
//! ```json
//! { "query": { "stale_time_ms": 60000, "refetch_on_window_focus": true, "retry": 2 } }
//! ```
//!
//! Missing fields fall back to their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Caching behaviour for one query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// How long a fetched value is served without refetching.
    #[serde(rename = "stale_time_ms", with = "millis")]
    pub stale_time: Duration,

    /// Refetch when [`QueryCache::window_focused`](crate::query::QueryCache::window_focused) fires.
    pub refetch_on_window_focus: bool,

    /// Extra attempts after a failed fetch.
    pub retry: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            refetch_on_window_focus: false,
            retry: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Query options for entity types that do not override them.
    pub query: QueryOptions,
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
