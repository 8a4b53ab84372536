//! Instrumented resource shared by the integration tests.
//!
//! Every connection gets a sequential id; the probe records how many times
//! each id was closed so tests can assert "closed exactly once".

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nebula_pool::{Config, Context, Error, Pool, PoolConfig, Resource, Result};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Connection string handed to the pool explicitly.
#[derive(Debug, Clone)]
pub struct Dsn(pub String);

impl Config for Dsn {
    fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::configuration("dsn cannot be empty"));
        }
        Ok(())
    }
}

pub fn dsn() -> Dsn {
    Dsn("mysql://pool-test/app".to_string())
}

/// Fake database handle.
#[derive(Debug, PartialEq, Eq)]
pub struct Connection {
    pub id: u64,
}

/// Counters observed by tests.
#[derive(Debug, Default)]
pub struct Probe {
    attempts: AtomicU64,
    closes: Mutex<HashMap<u64, u32>>,
}

impl Probe {
    /// Number of times `create` was called.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of times connection `id` was closed.
    pub fn close_count(&self, id: u64) -> u32 {
        self.closes.lock().get(&id).copied().unwrap_or(0)
    }

    /// Total close calls across all connections.
    pub fn total_closes(&self) -> u64 {
        self.closes.lock().values().map(|&n| u64::from(n)).sum()
    }

    /// Highest close count of any single connection.
    pub fn max_close_count(&self) -> u32 {
        self.closes.lock().values().copied().max().unwrap_or(0)
    }
}

pub struct TrackedResource {
    probe: Arc<Probe>,
    fail_create_on: Option<u64>,
    fail_close_of: Vec<u64>,
    panic_close_of: Vec<u64>,
    create_delay: Option<Duration>,
}

impl TrackedResource {
    pub fn new() -> (Self, Arc<Probe>) {
        init_tracing();
        let probe = Arc::new(Probe::default());
        let resource = Self {
            probe: Arc::clone(&probe),
            fail_create_on: None,
            fail_close_of: Vec::new(),
            panic_close_of: Vec::new(),
            create_delay: None,
        };
        (resource, probe)
    }

    /// Fail the `call`-th create (0-based).
    pub fn failing_create_on(mut self, call: u64) -> Self {
        self.fail_create_on = Some(call);
        self
    }

    /// Make closing connection `id` return an error.
    pub fn failing_close_of(mut self, id: u64) -> Self {
        self.fail_close_of.push(id);
        self
    }

    /// Make closing connection `id` panic (after the close is counted).
    pub fn panicking_close_of(mut self, id: u64) -> Self {
        self.panic_close_of.push(id);
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }
}

impl Resource for TrackedResource {
    type Config = Dsn;
    type Instance = Connection;

    fn id(&self) -> &str {
        "tracked"
    }

    async fn create(&self, _dsn: &Dsn, _ctx: &Context) -> Result<Connection> {
        let n = self.probe.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create_on == Some(n) {
            return Err(Error::unavailable(
                "tracked",
                format!("connection {n} refused"),
                false,
            ));
        }
        Ok(Connection { id: n })
    }

    async fn is_valid(&self, conn: &Connection) -> Result<bool> {
        Ok(self.probe.close_count(conn.id) == 0)
    }

    async fn cleanup(&self, conn: Connection) -> Result<()> {
        *self.probe.closes.lock().entry(conn.id).or_default() += 1;
        if self.panic_close_of.contains(&conn.id) {
            panic!("driver crashed while closing connection {}", conn.id);
        }
        if self.fail_close_of.contains(&conn.id) {
            return Err(Error::cleanup(
                "tracked",
                format!("connection {} reset during close", conn.id),
            ));
        }
        Ok(())
    }
}

/// Install a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// `usize` count as the `u64` the pool reports.
pub fn count(n: usize) -> u64 {
    u64::try_from(n).expect("count fits in u64")
}

pub fn ctx() -> Context {
    Context::new()
}

pub async fn tracked_pool(size: usize) -> (Pool<TrackedResource>, Arc<Probe>) {
    let (resource, probe) = TrackedResource::new();
    let pool = Pool::new(resource, dsn(), PoolConfig::with_size(size), &ctx())
        .await
        .expect("pool construction");
    (pool, probe)
}
