//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pool construction, checkout, release and shutdown
#[derive(Error, Debug)]
pub enum Error {
    /// Pool or resource configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
        /// The invalid configuration value (if available)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Filling the pool failed; every instance created so far was closed
    #[error("Initialization failed for resource '{resource_id}': {reason}")]
    Initialization {
        /// The resource identifier
        resource_id: String,
        /// The failure reason
        reason: String,
        /// The factory error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Resource is not available (reported by a `Resource` implementation)
    #[error("Resource '{resource_id}' is unavailable: {reason}")]
    Unavailable {
        /// The resource identifier
        resource_id: String,
        /// The unavailability reason
        reason: String,
        /// Whether the resource might become available later
        retryable: bool,
    },

    /// The pool is shutting down or already shut down
    #[error("Pool for resource '{resource_id}' is closed")]
    PoolClosed {
        /// The resource identifier
        resource_id: String,
    },

    /// Closing an instance failed
    #[error("Cleanup failed for resource '{resource_id}': {reason}")]
    Cleanup {
        /// The resource identifier
        resource_id: String,
        /// The cleanup failure reason
        reason: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timeout
    #[error("Operation '{operation}' timed out after {timeout_ms}ms for resource '{resource_id}'")]
    Timeout {
        /// The resource identifier
        resource_id: String,
        /// The timeout duration in milliseconds
        timeout_ms: u64,
        /// The operation that timed out
        operation: String,
    },

    /// The caller's cancellation token fired
    #[error("Operation '{operation}' was cancelled for resource '{resource_id}'")]
    Cancelled {
        /// The resource identifier
        resource_id: String,
        /// The operation that was cancelled
        operation: String,
    },

    /// Every instance is checked out and the caller asked not to wait
    #[error("Resource pool exhausted for '{resource_id}': {current_size}/{max_size} in use")]
    PoolExhausted {
        /// The resource identifier
        resource_id: String,
        /// Instances currently checked out
        current_size: usize,
        /// Pool capacity
        max_size: usize,
    },

    /// A guard was handed to a pool that did not issue it.
    ///
    /// This is a caller bug, not a transient condition.
    #[error("Guard from pool {guard_pool} released into pool {pool} for resource '{resource_id}'")]
    ForeignRelease {
        /// The resource identifier of the receiving pool
        resource_id: String,
        /// Identifier of the receiving pool
        pool: uuid::Uuid,
        /// Identifier of the pool that issued the guard
        guard_pool: uuid::Uuid,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an initialization error wrapping the factory failure
    pub fn initialization(
        resource_id: impl Into<String>,
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Initialization {
            resource_id: resource_id.into(),
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(
        resource_id: impl Into<String>,
        reason: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Unavailable {
            resource_id: resource_id.into(),
            reason: reason.into(),
            retryable,
        }
    }

    /// Create a cleanup error
    pub fn cleanup(resource_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cleanup {
            resource_id: resource_id.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn closed(resource_id: &str) -> Self {
        Self::PoolClosed {
            resource_id: resource_id.to_string(),
        }
    }

    pub(crate) fn cancelled(resource_id: &str, operation: &str) -> Self {
        Self::Cancelled {
            resource_id: resource_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::PoolExhausted { .. } => true,
            _ => false,
        }
    }

    /// Whether this error reports misuse of the pool API rather than a
    /// resource or timing problem.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ForeignRelease { .. })
    }

    /// Get the resource ID associated with this error (if any)
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Configuration { .. } => None,
            Self::Initialization { resource_id, .. }
            | Self::Unavailable { resource_id, .. }
            | Self::PoolClosed { resource_id }
            | Self::Cleanup { resource_id, .. }
            | Self::Timeout { resource_id, .. }
            | Self::Cancelled { resource_id, .. }
            | Self::PoolExhausted { resource_id, .. }
            | Self::ForeignRelease { resource_id, .. } => Some(resource_id),
        }
    }
}
