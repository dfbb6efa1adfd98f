use std::fmt;

use crate::stitching::TransportError;

/// A schema-shape violation. Always fatal: a graph producing one of these is never served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaBuildError {
    #[error("failed to parse schema document '{source_name}': {message}")]
    Parse {
        source_name: String,
        message: String,
    },
    #[error("invalid rename of '{type_name}.{field}' to '{to}': {reason}")]
    InvalidRename {
        type_name: String,
        field: String,
        to: String,
        reason: &'static str,
    },
    #[error("renaming '{type_name}.{field}' to '{to}' collides with another field of '{type_name}'")]
    FieldNameCollision {
        type_name: String,
        field: String,
        to: String,
    },
    #[error("'{type_name}.id' is nullable; identifier fields must be non-null")]
    NullableId { type_name: String },
    #[error("'{type_name}.id' has no identifier tag in its description; tag it or rename it")]
    UntaggedId { type_name: String },
    #[error("field '{type_name}.{field}' is already declared")]
    DuplicateField { type_name: String, field: String },
    #[error("type '{type_name}' is declared by more than one schema")]
    TypeCollision { type_name: String },
    #[error("'{referenced_by}' references unknown type '{type_name}'")]
    UnknownType {
        type_name: String,
        referenced_by: String,
    },
    #[error("cannot extend unknown type '{type_name}'")]
    UnknownExtensionTarget { type_name: String },
    #[error("extension field '{type_name}.{field}' has no resolver")]
    MissingExtensionResolver { type_name: String, field: String },
}

/// Every violation found while building one schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaBuildErrors(pub Vec<SchemaBuildError>);

impl SchemaBuildErrors {
    pub fn push(&mut self, error: SchemaBuildError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaBuildError> {
        self.0.iter()
    }

    /// `Ok(value)` when no violation was collected.
    pub fn into_result<T>(self, value: T) -> Result<T, SchemaBuildErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<SchemaBuildError> for SchemaBuildErrors {
    fn from(error: SchemaBuildError) -> Self {
        Self(vec![error])
    }
}

impl Extend<SchemaBuildError> for SchemaBuildErrors {
    fn extend<I: IntoIterator<Item = SchemaBuildError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for SchemaBuildErrors {
    type Item = SchemaBuildError;
    type IntoIter = std::vec::IntoIter<SchemaBuildError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for SchemaBuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema build failed with {} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaBuildErrors {}

/// A field resolution failure, reported per field at request time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolverError {
    #[error("request to remote schema '{remote}' failed: {source}")]
    Transport {
        remote: String,
        #[source]
        source: TransportError,
    },
    #[error("remote schema '{remote}' failed to resolve '{field}': {}", .messages.join("; "))]
    Remote {
        remote: String,
        field: String,
        messages: Vec<String>,
    },
    #[error("{stage} failed after '{completed}' succeeded: {source}")]
    DependentDelegation {
        completed: String,
        stage: String,
        #[source]
        source: Box<ResolverError>,
    },
    #[error("invalid arguments for '{field}': {message}")]
    InvalidArguments { field: String, message: String },
    #[error("{0}")]
    Message(String),
}

impl ResolverError {
    pub fn message(message: impl Into<String>) -> Self {
        ResolverError::Message(message.into())
    }

    /// Whether the failure happened in a dependent call, after an earlier delegation succeeded.
    pub fn is_dependent_failure(&self) -> bool {
        matches!(self, ResolverError::DependentDelegation { .. })
    }
}
