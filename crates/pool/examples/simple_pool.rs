//! Simple pooling example
//!
//! Builds a pool of fake database handles, checks a few out concurrently,
//! and shuts the pool down once the holders are done.
//!
//! Run with `RUST_LOG=nebula_pool=debug` to see the pool's own logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nebula_pool::{Config, Context, Error, Pool, PoolConfig, Resource, Result};
use tracing_subscriber::EnvFilter;

// -- Configuration ----------------------------------------------------------

/// Connection string for the fake database.
#[derive(Debug, Clone)]
struct DbConfig {
    url: String,
}

impl Config for DbConfig {
    fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::configuration("url cannot be empty"));
        }
        Ok(())
    }
}

// -- Instance ---------------------------------------------------------------

/// Simulated database handle.
#[derive(Debug)]
struct DbHandle {
    id: u64,
    queries: u64,
}

impl DbHandle {
    async fn query(&mut self, sql: &str) -> String {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.queries += 1;
        format!("handle {} ran `{sql}` ({} queries so far)", self.id, self.queries)
    }
}

// -- Resource ---------------------------------------------------------------

#[derive(Default)]
struct Database {
    next_id: AtomicU64,
}

impl Resource for Database {
    type Config = DbConfig;
    type Instance = DbHandle;

    fn id(&self) -> &str {
        "demo-db"
    }

    async fn create(&self, config: &DbConfig, _ctx: &Context) -> Result<DbHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::info!(id, url = %config.url, "Opening handle");
        Ok(DbHandle { id, queries: 0 })
    }

    async fn cleanup(&self, handle: DbHandle) -> Result<()> {
        tracing::info!(id = handle.id, queries = handle.queries, "Closing handle");
        Ok(())
    }
}

// -- Main -------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ctx = Context::new().with_metadata("app", "simple_pool");
    let pool = Pool::new(
        Database::default(),
        DbConfig {
            url: "mysql://localhost/demo".to_string(),
        },
        PoolConfig {
            size: 2,
            acquire_timeout: Some(Duration::from_secs(1)),
        },
        &ctx,
    )
    .await?;
    println!("Pool created: {:?}", pool.stats());

    // Four workers share two handles; two of them wait their turn.
    let mut workers = Vec::new();
    for worker in 0..4 {
        let pool = pool.clone();
        let ctx = ctx.clone();
        workers.push(tokio::spawn(async move {
            let mut handle = pool.acquire(&ctx).await?;
            let line = handle.query(&format!("SELECT {worker}")).await;
            println!("worker {worker}: {line}");
            pool.release(handle).await
        }));
    }
    for worker in workers {
        worker.await??;
    }
    println!("After workers: {:?}", pool.stats());

    // Hold one handle across shutdown; close waits for it.
    let held = pool.acquire(&ctx).await?;
    let closer = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.close().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("While closing: state={} stats={:?}", pool.state(), pool.stats());

    match pool.try_acquire(&ctx) {
        Err(e) => println!("Acquire during shutdown rejected: {e}"),
        Ok(_) => println!("unexpected: acquired during shutdown"),
    }

    drop(held);
    let report = closer.await?;
    println!(
        "Pool closed: state={} closed={} clean={}",
        pool.state(),
        report.closed,
        report.is_clean()
    );

    Ok(())
}
