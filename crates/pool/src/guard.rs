//! RAII guard for checked-out instances

use uuid::Uuid;

/// RAII guard that wraps a checked-out instance.
///
/// The guard is the caller's exclusive handle on the instance. Dropping it
/// runs the on-drop callback, which checks the instance back into the pool
/// it came from (or closes it if that pool is shutting down). Passing it to
/// [`Pool::release`](crate::Pool::release) does the same explicitly.
pub struct Guard<T> {
    resource: Option<T>,
    pool_id: Uuid,
    on_drop: Option<Box<dyn FnOnce(T) + Send>>,
}

impl<T> Guard<T> {
    /// Create a new guard wrapping `resource` issued by pool `pool_id`.
    pub(crate) fn new<F>(resource: T, pool_id: Uuid, on_drop: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            resource: Some(resource),
            pool_id,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Identifier of the pool that issued this guard.
    #[must_use]
    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    /// Take the instance out of the guard, preventing the drop callback.
    pub(crate) fn into_inner(mut self) -> T {
        self.on_drop.take(); // prevent callback
        self.resource.take().expect("guard used after into_inner")
    }
}

impl<T> std::ops::Deref for Guard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource.as_ref().expect("guard used after into_inner")
    }
}

impl<T> std::ops::DerefMut for Guard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource.as_mut().expect("guard used after into_inner")
    }
}

impl<T> Drop for Guard<T> {
    fn drop(&mut self) {
        if let (Some(resource), Some(on_drop)) = (self.resource.take(), self.on_drop.take()) {
            on_drop(resource);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Guard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("resource", &self.resource)
            .field("pool_id", &self.pool_id)
            .finish()
    }
}
