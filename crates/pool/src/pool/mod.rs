//! Fixed-size resource pool integrated with the `Resource` trait.
//!
//! `Pool<R>` fills itself with `R::create` up front, hands instances out as
//! [`Guard`]s, takes them back on release or drop, and closes every instance
//! exactly once through `R::cleanup` when shut down.
//!
//! All bookkeeping (state flag, idle queue, counters) sits behind a single
//! lock, so a checkout can never slip past a concurrent [`Pool::close`].

pub mod config;
mod inventory;

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::guard::Guard;
use crate::resource::{Config, Resource};

pub use config::PoolConfig;
pub use inventory::PoolState;
use inventory::Inventory;

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Fixed number of instances the pool was built with.
    pub size: usize,
    /// Instances waiting in the pool.
    pub idle: usize,
    /// Instances currently checked out.
    pub active: usize,
    /// Instances whose close is in flight.
    pub closing: usize,
    /// Total successful acquisitions.
    pub total_acquisitions: u64,
    /// Total check-ins (explicit releases and guard drops).
    pub total_releases: u64,
    /// Instances closed successfully.
    pub closed: u64,
    /// Instances whose close returned an error.
    pub close_failures: u64,
}

/// Outcome of [`Pool::close`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// `true` for the call that actually shut the pool down; `false` for
    /// every redundant call.
    pub initiated: bool,
    /// Instances closed successfully.
    pub closed: u64,
    /// Close errors, one per instance that failed to close.
    pub failures: Vec<Error>,
}

impl ShutdownReport {
    /// Whether every instance closed cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Inner shared state for the pool.
struct PoolInner<R: Resource> {
    id: Uuid,
    resource: R,
    pool_config: PoolConfig,
    inventory: Mutex<Inventory<R::Instance>>,
    /// Woken on every check-in and on shutdown.
    available: Notify,
    /// Woken once when the pool reaches `Closed`.
    drained: Notify,
}

/// Fixed-size resource pool.
///
/// Cloning is cheap; every clone refers to the same pool.
pub struct Pool<R: Resource> {
    inner: Arc<PoolInner<R>>,
}

impl<R: Resource> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Resource> std::fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (state, stats) = {
            let inventory = self.inner.inventory.lock();
            (inventory.state(), inventory.stats())
        };
        f.debug_struct("Pool")
            .field("id", &self.inner.id)
            .field("resource_id", &self.inner.resource.id())
            .field("state", &state)
            .field("stats", &stats)
            .finish()
    }
}

impl<R: Resource> Pool<R> {
    /// Create a pool and fill it with `pool_config.size` instances.
    ///
    /// Instances are created one after another. If any creation fails, or
    /// `ctx` is cancelled in between, every instance created so far is
    /// closed and no pool is returned.
    ///
    /// # Errors
    /// - [`Error::Configuration`] if either config is invalid
    /// - [`Error::Initialization`] wrapping the first factory error
    /// - [`Error::Cancelled`] if `ctx` was cancelled
    pub async fn new(
        resource: R,
        config: R::Config,
        pool_config: PoolConfig,
        ctx: &Context,
    ) -> Result<Self> {
        pool_config.validate()?;
        config.validate()?;

        let size = pool_config.size;
        let mut instances = Vec::with_capacity(size);
        for n in 0..size {
            let failure = if ctx.is_cancelled() {
                Error::cancelled(resource.id(), "construct")
            } else {
                match resource.create(&config, ctx).await {
                    Ok(instance) => {
                        instances.push(instance);
                        continue;
                    }
                    Err(e) => Error::initialization(
                        resource.id(),
                        format!("instance {} of {size} could not be created", n + 1),
                        e,
                    ),
                }
            };

            tracing::warn!(
                resource_id = resource.id(),
                created = instances.len(),
                error = %failure,
                "Pool construction failed, closing created instances"
            );
            for instance in instances {
                if let Err(e) = resource.cleanup(instance).await {
                    tracing::warn!(
                        resource_id = resource.id(),
                        error = %e,
                        "Failed to close instance during construction rollback"
                    );
                }
            }
            return Err(failure);
        }

        let id = Uuid::new_v4();
        tracing::debug!(resource_id = resource.id(), pool_id = %id, size, "Pool created");

        Ok(Self {
            inner: Arc::new(PoolInner {
                id,
                resource,
                pool_config,
                inventory: Mutex::new(Inventory::new(instances)),
                available: Notify::new(),
                drained: Notify::new(),
            }),
        })
    }

    /// Acquire an instance, waiting up to the configured
    /// [`acquire_timeout`](PoolConfig::acquire_timeout).
    ///
    /// Returns an RAII [`Guard`] that checks the instance back in when
    /// dropped.
    ///
    /// # Errors
    /// - [`Error::PoolClosed`] once shutdown has begun
    /// - [`Error::Cancelled`] if `ctx` is (or becomes) cancelled
    /// - [`Error::Timeout`] if nothing was released in time
    pub async fn acquire(&self, ctx: &Context) -> Result<Guard<R::Instance>> {
        self.checkout(ctx, self.inner.pool_config.acquire_timeout)
            .await
    }

    /// Acquire an instance, waiting at most `timeout`.
    ///
    /// Same semantics as [`acquire`](Self::acquire) with a per-call deadline.
    pub async fn acquire_timeout(
        &self,
        ctx: &Context,
        timeout: Duration,
    ) -> Result<Guard<R::Instance>> {
        self.checkout(ctx, Some(timeout)).await
    }

    /// Acquire an idle instance without waiting.
    ///
    /// # Errors
    /// [`Error::PoolExhausted`] if every instance is checked out, otherwise
    /// as [`acquire`](Self::acquire).
    pub fn try_acquire(&self, ctx: &Context) -> Result<Guard<R::Instance>> {
        let inner = &self.inner;
        if ctx.is_cancelled() {
            return Err(Error::cancelled(inner.resource.id(), "acquire"));
        }
        let instance = {
            let mut inventory = inner.inventory.lock();
            if inventory.state() != PoolState::Open {
                return Err(Error::closed(inner.resource.id()));
            }
            match inventory.check_out() {
                Some(instance) => instance,
                None => {
                    return Err(Error::PoolExhausted {
                        resource_id: inner.resource.id().to_string(),
                        current_size: inventory.checked_out(),
                        max_size: inventory.size(),
                    });
                }
            }
        };
        Ok(self.guard(instance))
    }

    async fn checkout(
        &self,
        ctx: &Context,
        timeout: Option<Duration>,
    ) -> Result<Guard<R::Instance>> {
        let inner = &self.inner;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if ctx.is_cancelled() {
                return Err(Error::cancelled(inner.resource.id(), "acquire"));
            }

            // Register as a waiter before looking, so a check-in between the
            // look and the wait is delivered to us rather than coalesced into
            // a single stored permit.
            let mut notified = pin!(inner.available.notified());
            notified.as_mut().enable();

            let instance = {
                let mut inventory = inner.inventory.lock();
                if inventory.state() != PoolState::Open {
                    return Err(Error::closed(inner.resource.id()));
                }
                inventory.check_out()
            };
            if let Some(instance) = instance {
                tracing::debug!(resource_id = inner.resource.id(), "Acquired instance");
                return Ok(self.guard(instance));
            }

            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                () = ctx.cancellation.cancelled() => {
                    return Err(Error::cancelled(inner.resource.id(), "acquire"));
                }
                () = notified.as_mut() => {}
                () = expired => {
                    return Err(Error::Timeout {
                        resource_id: inner.resource.id().to_string(),
                        timeout_ms: timeout
                            .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
                        operation: "acquire".to_string(),
                    });
                }
            }
        }
    }

    fn guard(&self, instance: R::Instance) -> Guard<R::Instance> {
        let inner = Arc::clone(&self.inner);
        Guard::new(instance, self.inner.id, move |instance| {
            inner.check_in(instance);
        })
    }

    /// Return a checked-out instance to the pool.
    ///
    /// While the pool is open the instance becomes available to the next
    /// acquirer. Once shutdown has begun it is closed before this returns;
    /// a close failure is logged and reported by [`close`](Self::close),
    /// not here.
    ///
    /// Dropping the guard does the same thing, except that a close during
    /// shutdown runs on a spawned task.
    ///
    /// # Errors
    /// [`Error::ForeignRelease`] if the guard was issued by another pool.
    /// The guard is then dropped and goes back to the pool that issued it.
    pub async fn release(&self, guard: Guard<R::Instance>) -> Result<()> {
        let inner = &self.inner;
        if guard.pool_id() != inner.id {
            tracing::error!(
                resource_id = inner.resource.id(),
                pool_id = %inner.id,
                guard_pool_id = %guard.pool_id(),
                "Guard released into a pool that did not issue it"
            );
            return Err(Error::ForeignRelease {
                resource_id: inner.resource.id().to_string(),
                pool: inner.id,
                guard_pool: guard.pool_id(),
            });
        }

        let rejected = inner.inventory.lock().check_in(guard.into_inner());
        match rejected {
            None => inner.available.notify_one(),
            Some(instance) => {
                // Spawned so a dropped release future cannot strand the close.
                // A panicking cleanup is recorded as a close failure by the
                // task itself and surfaces in the shutdown report.
                let handle = tokio::spawn(Arc::clone(inner).close_instance(instance));
                if let Err(e) = handle.await {
                    tracing::debug!(
                        resource_id = inner.resource.id(),
                        error = %e,
                        "Close task ended abnormally"
                    );
                }
            }
        }
        Ok(())
    }

    /// Run the resource's validity check on a checked-out instance.
    pub async fn check(&self, guard: &Guard<R::Instance>) -> Result<bool> {
        self.inner.resource.is_valid(guard).await
    }

    /// Shut the pool down and wait until every instance is closed.
    ///
    /// The first call flips the pool to [`PoolState::Closing`]: new
    /// acquisitions fail with [`Error::PoolClosed`], blocked acquirers are
    /// woken with the same error, idle instances are closed, and instances
    /// still checked out are closed as their holders release them. The call
    /// returns once the pool is [`PoolState::Closed`].
    ///
    /// Any later call returns immediately with
    /// [`ShutdownReport::initiated`] set to `false`.
    ///
    /// Close errors never abort the shutdown; they are collected in the
    /// report.
    pub async fn close(&self) -> ShutdownReport {
        let inner = &self.inner;

        let (drained, checked_out) = {
            let mut inventory = inner.inventory.lock();
            match inventory.begin_close() {
                Some(drained) => (drained, inventory.checked_out()),
                None => {
                    tracing::debug!(
                        resource_id = inner.resource.id(),
                        state = %inventory.state(),
                        "Pool already shutting down"
                    );
                    return ShutdownReport::default();
                }
            }
        };

        tracing::info!(
            resource_id = inner.resource.id(),
            idle = drained.len(),
            checked_out,
            "Closing pool"
        );
        inner.available.notify_waiters();

        for instance in drained {
            drop(tokio::spawn(Arc::clone(inner).close_instance(instance)));
        }

        // Covers the case where nothing was idle or checked out.
        let finished = inner.inventory.lock().try_finish();
        if finished {
            inner.drained.notify_waiters();
        }

        loop {
            let notified = inner.drained.notified();
            let closed = inner.inventory.lock().state() == PoolState::Closed;
            if closed {
                break;
            }
            notified.await;
        }

        let (closed, failures) = {
            let mut inventory = inner.inventory.lock();
            (inventory.stats().closed, inventory.take_failures())
        };
        tracing::info!(
            resource_id = inner.resource.id(),
            closed,
            failed = failures.len(),
            "Pool closed"
        );

        ShutdownReport {
            initiated: true,
            closed,
            failures,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.inner.inventory.lock().state()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() != PoolState::Open
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.inventory.lock().stats()
    }

    /// Fixed number of instances in this pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.pool_config.size
    }

    /// Unique identifier of this pool.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Identifier of the pooled resource type.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        self.inner.resource.id()
    }
}

impl<R: Resource> PoolInner<R> {
    /// Check-in path for dropped guards.
    fn check_in(self: &Arc<Self>, instance: R::Instance) {
        let rejected = self.inventory.lock().check_in(instance);
        let Some(instance) = rejected else {
            tracing::debug!(resource_id = self.resource.id(), "Instance returned to pool");
            self.available.notify_one();
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn(Arc::clone(self).close_instance(instance)));
            }
            Err(_) => {
                tracing::warn!(
                    resource_id = self.resource.id(),
                    "Guard dropped outside a tokio runtime during shutdown; instance dropped without close"
                );
                drop(instance);
                self.record_close(Err(Error::cleanup(
                    self.resource.id(),
                    "no tokio runtime available to close instance",
                )));
            }
        }
    }

    /// Future that closes `instance` and records the outcome.
    ///
    /// The ticket is taken before the future is first polled, so dropping
    /// the future at any point still settles the close.
    fn close_instance(
        self: Arc<Self>,
        instance: R::Instance,
    ) -> impl Future<Output = ()> + Send + 'static {
        let ticket = CloseTicket {
            inner: self,
            settled: false,
        };
        async move {
            let result = ticket.inner.resource.cleanup(instance).await;
            if let Err(e) = &result {
                tracing::warn!(
                    resource_id = ticket.inner.resource.id(),
                    error = %e,
                    "Failed to close instance"
                );
            }
            ticket.settle(result);
        }
    }

    fn record_close(&self, result: Result<()>) {
        let finished = self.inventory.lock().finish_close(result);
        if finished {
            tracing::debug!(resource_id = self.resource.id(), "Last instance closed");
            self.drained.notify_waiters();
        }
    }
}

/// Accounts for one in-flight close exactly once.
///
/// If the close future is dropped before `cleanup` returns (the cleanup
/// panicked, or its task was cancelled by runtime shutdown) the close is
/// recorded as a failure, so the pool still reaches `Closed`.
struct CloseTicket<R: Resource> {
    inner: Arc<PoolInner<R>>,
    settled: bool,
}

impl<R: Resource> CloseTicket<R> {
    fn settle(mut self, result: Result<()>) {
        self.settled = true;
        self.inner.record_close(result);
    }
}

impl<R: Resource> Drop for CloseTicket<R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::error!(
            resource_id = self.inner.resource.id(),
            "Instance close aborted before cleanup returned"
        );
        self.inner.record_close(Err(Error::cleanup(
            self.inner.resource.id(),
            "close aborted before cleanup returned (panicked or cancelled)",
        )));
    }
}
