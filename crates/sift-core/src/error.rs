//! Core error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::filter::Operator;

/// Errors raised while compiling, executing or materializing a query.
#[derive(Debug, Error)]
pub enum Error {
    /// The entity type is not registered with the metadata provider.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// An attribute path does not resolve against the entity model.
    #[error("unknown attribute path '{path}' on entity '{entity}'")]
    UnknownField { entity: String, path: String },

    /// The operator cannot be applied to the attribute's declared type.
    #[error("operator {operator} is not supported on '{path}' of type {found}")]
    UnsupportedType {
        path: String,
        operator: Operator,
        found: String,
    },

    /// A text token matched no operator and classification was mandatory.
    #[error("value '{token}' for field '{path}' cannot be classified")]
    UnclassifiableToken { path: String, token: String },

    /// A restriction value does not have the shape its operator requires.
    #[error("invalid {operator} restriction on '{path}': {reason}")]
    InvalidRestriction {
        path: String,
        operator: Operator,
        reason: String,
    },

    /// A relationship attribute was projected as a column.
    #[error("attribute '{path}' of type {found} cannot be projected as a column")]
    NotProjectable { path: String, found: String },

    /// A to-many attribute declares no element type.
    #[error("collection '{attribute}' on entity '{entity}' declares no element type")]
    MissingElementType { entity: String, attribute: String },

    /// The operation needs a single-attribute identifier.
    #[error("entity '{entity}' has no single identifier attribute: {reason}")]
    CompositeIdentifier { entity: String, reason: String },

    /// The backend failed to execute a plan.
    #[error("query on '{entity}' failed: {source}")]
    Backend {
        entity: String,
        #[source]
        source: BackendError,
    },

    /// Result rows could not be turned into objects.
    #[error("failed to materialize '{entity}': {message}")]
    Materialize { entity: String, message: String },

    /// Invalid compiler configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON conversion error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a configuration error (raised before any backend call, never retried).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownEntity(_)
                | Error::UnknownField { .. }
                | Error::UnsupportedType { .. }
                | Error::UnclassifiableToken { .. }
                | Error::InvalidRestriction { .. }
                | Error::NotProjectable { .. }
                | Error::MissingElementType { .. }
                | Error::CompositeIdentifier { .. }
                | Error::Config(_)
        )
    }

    /// Wrap a backend failure with the entity it was querying.
    pub fn backend(entity: impl Into<String>, source: BackendError) -> Self {
        Error::Backend {
            entity: entity.into(),
            source,
        }
    }

    /// Build a materialization error.
    pub fn materialize(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Materialize {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_field(entity: impl Into<String>, path: impl Into<String>) -> Self {
        Error::UnknownField {
            entity: entity.into(),
            path: path.into(),
        }
    }
}
