//! Resource traits (bb8-style)
//!
//! The `Resource` trait is the pool's only view of the things it manages:
//! how to create one, how to ask whether one is still alive, and how to
//! close one for good.

use std::future::Future;

use crate::context::Context;
use crate::error::Result;

/// Configuration trait for resource types.
///
/// The configuration value (connection string, credentials, driver options)
/// is handed to [`Pool::new`](crate::Pool::new) explicitly and validated
/// before the first instance is created.
pub trait Config: Send + Sync + 'static {
    /// Validate the configuration, returning an error if invalid.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Core resource trait (bb8-style).
///
/// Each resource type has an associated `Config` and `Instance`.
pub trait Resource: Send + Sync + 'static {
    /// The configuration type for this resource.
    type Config: Config;

    /// The instance type handed out by the pool (e.g. a database handle).
    type Instance: Send + Sync + 'static;

    /// Unique string identifier for this resource type (e.g. "postgres", "mysql").
    fn id(&self) -> &str;

    /// Create a new instance from config and context.
    ///
    /// Only called while the pool is being filled.
    fn create(
        &self,
        config: &Self::Config,
        ctx: &Context,
    ) -> impl Future<Output = Result<Self::Instance>> + Send;

    /// Check whether an existing instance is still usable (e.g. a ping).
    ///
    /// The pool never calls this on its own; see
    /// [`Pool::check`](crate::Pool::check).
    fn is_valid(&self, _instance: &Self::Instance) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }

    /// Close an instance when it is permanently removed.
    ///
    /// The pool calls this exactly once per instance.
    fn cleanup(&self, instance: Self::Instance) -> impl Future<Output = Result<()>> + Send {
        async move {
            drop(instance);
            Ok(())
        }
    }
}
