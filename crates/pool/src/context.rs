//! Operation context with cancellation support

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Context for pool operations.
///
/// Carries the caller's cancellation token and arbitrary metadata. Passed to
/// [`Resource::create`](crate::Resource::create) during construction and to
/// every acquire call, so waits can be abandoned cooperatively.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Cooperative cancellation token. A blocked acquire returns
    /// [`Error::Cancelled`](crate::Error::Cancelled) as soon as it fires.
    pub cancellation: CancellationToken,
    /// Arbitrary key-value pairs for resource implementations
    /// (e.g. application name, region hints).
    pub metadata: HashMap<String, String>,
}

impl Context {
    /// Create a context with a fresh cancellation token and no metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-value metadata pair to the context.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the default cancellation token with the provided one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Whether the caller has asked to abandon the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
