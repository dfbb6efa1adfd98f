use serde::{Deserialize, Serialize};

/// A document-level failure. No field was resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("the document contains no operation")]
    NoOperation,
    #[error("the document contains several operations; an operation name is required")]
    OperationNameRequired,
    #[error("the schema has no mutation type")]
    NoMutationType,
    #[error("subscriptions are not supported")]
    SubscriptionsNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A field failure, reported next to the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}
