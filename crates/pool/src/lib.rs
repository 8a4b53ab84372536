//! # Nebula Pool
//!
//! A fixed-size pool of expensive-to-create resources (database handles,
//! broker connections) shared between concurrent tasks.
//!
//! - [`Pool::new`] creates every instance up front and fails atomically.
//! - [`Pool::acquire`] hands out a [`Guard`], waiting for a release, a
//!   deadline or the caller's cancellation token.
//! - [`Pool::release`] (or dropping the guard) puts the instance back, or
//!   closes it once shutdown has begun.
//! - [`Pool::close`] stops checkouts and waits until every instance is
//!   closed exactly once.
//!
//! ```no_run
//! use nebula_pool::{Config, Context, Pool, PoolConfig, Resource, Result};
//!
//! struct Dsn(String);
//! impl Config for Dsn {}
//!
//! struct Database;
//!
//! impl Resource for Database {
//!     type Config = Dsn;
//!     type Instance = String;
//!
//!     fn id(&self) -> &str {
//!         "database"
//!     }
//!
//!     async fn create(&self, dsn: &Dsn, _ctx: &Context) -> Result<String> {
//!         Ok(format!("handle to {}", dsn.0))
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let ctx = Context::new();
//! let pool = Pool::new(Database, Dsn("db://local".into()), PoolConfig::with_size(4), &ctx).await?;
//! let handle = pool.acquire(&ctx).await?;
//! pool.release(handle).await?;
//! pool.close().await;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod guard;
pub mod pool;
pub mod resource;

pub use context::Context;
pub use error::{Error, Result};
pub use guard::Guard;
pub use pool::{Pool, PoolConfig, PoolState, PoolStats, ShutdownReport};
pub use resource::{Config, Resource};
