//! Pool acquire() cancellation safety tests.
//!
//! Cancelling an acquire, before or during the wait, must not take an
//! instance out of the pool or disturb its counters.

mod common;

use std::time::Duration;

use common::{ctx, tracked_pool};
use nebula_pool::{Context, Error};
use tokio_util::sync::CancellationToken;

fn cancelled_ctx() -> Context {
    let token = CancellationToken::new();
    token.cancel();
    Context::new().with_cancellation(token)
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_acquire_fails_immediately_even_with_idle_instances() {
    let (pool, _probe) = tracked_pool(2).await;
    let before = pool.stats();
    let started = tokio::time::Instant::now();

    let err = pool
        .acquire_timeout(&cancelled_ctx(), Duration::from_secs(10))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Cancelled { ref operation, .. } if operation == "acquire"),
        "expected Cancelled, got: {err:?}"
    );
    assert_eq!(started.elapsed(), Duration::ZERO, "must not wait");
    assert_eq!(pool.stats(), before, "availability unchanged");
}

#[tokio::test]
async fn pre_cancelled_try_acquire_fails() {
    let (pool, _probe) = tracked_pool(1).await;
    let err = pool.try_acquire(&cancelled_ctx()).unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(pool.stats().idle, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn acquire_cancelled_mid_wait_no_slot_leak() {
    let (pool, _probe) = tracked_pool(1).await;

    // Hold the only instance
    let g1 = pool.acquire(&ctx()).await.unwrap();
    let held_id = g1.id;

    let token = CancellationToken::new();
    let cancel_ctx = Context::new().with_cancellation(token.clone());

    let pool_clone = pool.clone();
    let handle = tokio::spawn(async move {
        pool_clone
            .acquire_timeout(&cancel_ctx, Duration::from_secs(30))
            .await
    });

    // Let the acquire start waiting
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("cancelled acquire returns promptly")
        .unwrap();
    assert!(matches!(result, Err(Error::Cancelled { .. })));

    drop(g1);

    let g3 = pool
        .acquire(&ctx())
        .await
        .expect("pool should still work after cancelled acquire");
    assert_eq!(g3.id, held_id, "should reuse the returned instance");
    drop(g3);

    let stats = pool.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.idle, 1);
    assert_eq!(stats.total_acquisitions, 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_waiter_does_not_swallow_wakeup() {
    let (pool, _probe) = tracked_pool(1).await;
    let held = pool.acquire(&ctx()).await.unwrap();

    let token = CancellationToken::new();
    let doomed = {
        let pool = pool.clone();
        let ctx = Context::new().with_cancellation(token.clone());
        tokio::spawn(async move { pool.acquire_timeout(&ctx, Duration::from_secs(5)).await })
    };
    let survivor = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire_timeout(&ctx(), Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    token.cancel();
    drop(held);

    assert!(matches!(doomed.await.unwrap(), Err(Error::Cancelled { .. })));
    assert!(survivor.await.unwrap().is_ok(), "release reaches the remaining waiter");
}
