//! Pattern build errors

use thiserror::Error;

/// The two failure classes of a pattern build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The pattern itself is malformed
    Validation,
    /// The pattern names a collection or entity the context doesn't have
    Lookup,
}

/// Error raised while building a pattern; aborts the whole build
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("malformed pattern node: {0}")]
    Malformed(String),
    #[error("'{type_tag}' is missing required field '{field}'")]
    MissingField { type_tag: String, field: String },
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("malformed coordinate {0}")]
    BadCoordinate(String),
    #[error("malformed color {0}")]
    BadColor(String),
    #[error("'{field}' is left for the caller but the node is not deferred")]
    SentinelNotDeferred { field: String },
    #[error("deferred slot '{field}' was not supplied by the caller")]
    UnfilledSlot { field: String },
    #[error("type '{0}' is already registered")]
    DuplicateType(String),
    #[error("no collection named '{0}'")]
    UnknownCollection(String),
    #[error("no entity named '{0}'")]
    UnknownEntity(String),
}

impl BuildError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::UnknownCollection(_) | BuildError::UnknownEntity(_) => ErrorKind::Lookup,
            _ => ErrorKind::Validation,
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(e: serde_json::Error) -> Self {
        BuildError::Malformed(e.to_string())
    }
}
