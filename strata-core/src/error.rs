//! Error types.
//!
//! Configuration mistakes (missing entity name, missing endpoint, missing
//! or duplicate identifier) surface immediately from the call that hit
//! them. Transport failures are first offered to the entity's error hooks
//! and only reach the caller if a hook re-raises them.

use std::fmt;

use thiserror::Error;

/// The entity operations that talk to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Post,
    Patch,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP-like status code, when the transport has one.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("entity type does not declare an ENTITY_NAME")]
    MissingEntityName,

    #[error("entity type does not declare a LIST_NAME")]
    MissingListName,

    #[error("no {operation} endpoint configured for `{entity}`")]
    EndpointNotConfigured {
        entity: &'static str,
        operation: Operation,
    },

    #[error("`{entity}` has no id; {operation} requires one")]
    MissingIdentifier {
        entity: &'static str,
        operation: Operation,
    },

    #[error("`{entity}` #{id} is already persisted; post creates new records only")]
    AlreadyPersisted { entity: &'static str, id: i64 },

    #[error("cannot cast {found} into `{entity}`")]
    InvalidCastValue {
        entity: &'static str,
        found: &'static str,
    },

    #[error("`{entity}` has no attribute `{name}`")]
    UnknownAttribute { entity: &'static str, name: String },

    #[error("invalid value for `{entity}.{name}`: {reason}")]
    InvalidAttributeValue {
        entity: &'static str,
        name: String,
        reason: String,
    },

    /// A cached fetch outlived the entity that registered it.
    #[error("query for `{entity}` ran after its entity was dropped")]
    Detached { entity: &'static str },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl EntityError {
    /// True for errors raised by the transport rather than by the caller's
    /// configuration.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, EntityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity_and_operation() {
        let err = EntityError::EndpointNotConfigured {
            entity: "user",
            operation: Operation::Get,
        };
        assert_eq!(err.to_string(), "no get endpoint configured for `user`");

        let err = EntityError::MissingIdentifier {
            entity: "user",
            operation: Operation::Delete,
        };
        assert!(err.to_string().contains("delete requires one"));
    }

    #[test]
    fn transport_errors_convert() {
        let err: EntityError = TransportError::with_status(503, "unavailable").into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "transport error: unavailable");
    }
}
