use std::fmt;

/// Cache key for one entity: `(entity type name, id)`.
///
/// Keys are derived from an entity on demand and never stored on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub entity: &'static str,
    pub id: i64,
}

impl QueryKey {
    pub const fn new(entity: &'static str, id: i64) -> Self {
        Self { entity, id }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?},{}]", self.entity, self.id)
    }
}
