//! Error taxonomy for adapter operations
//!
//! Four kinds of failure cross the adapter boundary. `NotFound` is the only
//! recoverable one, and only in two places: Read maps it to an absent state,
//! Delete swallows it. Everything else propagates to the caller unchanged.

use thiserror::Error;

/// Lifecycle operation being performed when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        };
        write!(f, "{}", s)
    }
}

/// Errors that can occur when reconciling a record against a remote resource
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The remote object does not exist
    #[error("{resource_type} '{identifier}' not found")]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    /// The remote call reported success but returned no usable payload
    #[error("{operation} {resource_type}: remote API returned an empty payload")]
    EmptyOutput {
        resource_type: String,
        operation: Operation,
    },

    /// Bad input rejected before any remote call was made
    #[error("invalid {resource_type} configuration: {message}")]
    Validation {
        resource_type: String,
        message: String,
    },

    /// Any other transport or API failure
    #[error("{operation} {resource_type} '{identifier}': {message}")]
    Remote {
        resource_type: String,
        operation: Operation,
        identifier: String,
        message: String,
    },
}

impl AdapterError {
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    pub fn empty_output(resource_type: impl Into<String>, operation: Operation) -> Self {
        Self::EmptyOutput {
            resource_type: resource_type.into(),
            operation,
        }
    }

    pub fn validation(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    pub fn remote(
        resource_type: impl Into<String>,
        operation: Operation,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            resource_type: resource_type.into(),
            operation,
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Whether this is the recoverable absent-object case
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
