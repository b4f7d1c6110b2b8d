//! Error types for the Geist operator
//!
//! Errors carry the connector or child object they relate to so log lines
//! emitted by the controller runner can be traced back to a resource.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Geist operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A child object could not be serialized
    #[error("serialization error for {kind}: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The child object kind being built
        kind: String,
    },

    /// Owner reference could not be attached to a child object
    #[error("ownership error for {child}: {message}")]
    Ownership {
        /// Name of the child object
        child: String,
        /// Description of what's wrong
        message: String,
    },

    /// Validation error for connector specs
    #[error("validation error for {connector}: {message}")]
    Validation {
        /// Name of the connector with invalid configuration
        connector: String,
        /// Description of what's invalid
        message: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            connector: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error with connector context
    pub fn validation_for(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            connector: connector.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error for a specific object kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: kind.into(),
        }
    }

    /// Create an ownership error for the named child object
    pub fn ownership(child: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Ownership {
            child: child.into(),
            message: msg.into(),
        }
    }

    /// Returns true if re-enqueueing the reconcile attempt may succeed
    ///
    /// Ownership and validation errors describe a misconfiguration that a
    /// retry cannot fix. Everything that came off the wire is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { .. } => true,
            Error::Serialization { .. } => true,
            Error::Ownership { .. } => false,
            Error::Validation { .. } => false,
        }
    }
}
