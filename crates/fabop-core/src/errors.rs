//! Unified error system for fabop
//!
//! A single error type shared by every crate in the workspace. Effect traits
//! carry their own narrow error enums and convert into [`FabopError`] at the
//! engine boundary, keeping the document or instance name in the message.

use crate::effects::{ConfigMapError, DeploymentError};

/// Unified error type for all fabop operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FabopError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Write rejected because the stored version moved on
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message naming the contended resource
        message: String,
    },

    /// Persisted document could not be read or written
    #[error("Store error: {message}")]
    Store {
        /// Error message describing the store failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Restart action failed
    #[error("Restart failed: {message}")]
    Restart {
        /// Error message naming the deployment
        message: String,
    },
}

impl FabopError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a restart error
    pub fn restart(message: impl Into<String>) -> Self {
        Self::Restart {
            message: message.into(),
        }
    }

    /// True when a retry after reloading the document may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Prefix the message with additional context, keeping the variant
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        let wrap = |message: String| format!("{context}: {message}");
        match self {
            Self::Invalid { message } => Self::invalid(wrap(message)),
            Self::NotFound { message } => Self::not_found(wrap(message)),
            Self::Conflict { message } => Self::conflict(wrap(message)),
            Self::Store { message } => Self::store(wrap(message)),
            Self::Serialization { message } => Self::serialization(wrap(message)),
            Self::Restart { message } => Self::restart(wrap(message)),
        }
    }
}

impl From<ConfigMapError> for FabopError {
    fn from(err: ConfigMapError) -> Self {
        match err {
            ConfigMapError::Conflict { .. } => Self::conflict(err.to_string()),
            ConfigMapError::Api { .. } => Self::store(err.to_string()),
        }
    }
}

impl From<DeploymentError> for FabopError {
    fn from(err: DeploymentError) -> Self {
        match err {
            DeploymentError::NotFound { .. } => Self::not_found(err.to_string()),
            DeploymentError::ConflictRetriesExhausted { .. } => Self::conflict(err.to_string()),
            DeploymentError::Api { .. } => Self::restart(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FabopError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Standard result type for fabop operations
pub type FabopResult<T> = Result<T, FabopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_variant() {
        let err = FabopError::conflict("resource version moved").context("peer-restart-config");
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Conflict: peer-restart-config: resource version moved"
        );
    }

    #[test]
    fn missing_deployment_maps_to_not_found() {
        let err: FabopError = DeploymentError::NotFound {
            name: "peer1".to_string(),
            namespace: "ns".to_string(),
        }
        .into();
        assert!(matches!(err, FabopError::NotFound { .. }));
    }
}
