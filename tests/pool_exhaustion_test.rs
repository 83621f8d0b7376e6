//! Exhaustion policy tests.
//!
//! Each test pins `max_active` low and checks what a second acquirer sees
//! under Fail, Block and Grow.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use synchronized_pool::{Error, ExhaustedAction, Lifecycle, PoolConfig, SynchronizedPool};

/// Hands out sequence numbers.
#[derive(Default)]
struct Counter {
    next: AtomicU64,
}

impl Lifecycle for Counter {
    type Resource = u64;
    type Error = Infallible;

    fn create(&self) -> Result<u64, Infallible> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

fn create_pool(max_active: usize, exhausted_action: ExhaustedAction) -> SynchronizedPool<Counter> {
    let config = PoolConfig {
        max_active,
        exhausted_action,
        reaper_interval: None,
        ..Default::default()
    };
    SynchronizedPool::new(Counter::default(), config).unwrap()
}

fn blocking(max_wait: Option<Duration>) -> ExhaustedAction {
    ExhaustedAction::Block { max_wait }
}

// ============================================================================
// Fail
// ============================================================================

#[test]
fn test_fail_policy_raises_exhausted() {
    let pool = create_pool(1, ExhaustedAction::Fail);

    let first = pool.acquire().unwrap();
    let second = pool.acquire();
    assert!(matches!(second, Err(Error::Exhausted { .. })));

    // Capacity comes back with the release.
    pool.release(first).unwrap();
    assert!(pool.acquire().is_ok());
}

// ============================================================================
// Block
// ============================================================================

#[test]
fn test_block_policy_times_out() {
    let pool = Arc::new(create_pool(1, blocking(Some(Duration::from_millis(100)))));
    let _held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let started = Instant::now();
            let result = pool.acquire();
            (result.map(|pooled| *pooled), started.elapsed())
        })
    };

    let (result, elapsed) = waiter.join().unwrap();
    match result {
        Err(Error::Timeout {
            waited,
            active,
            idle,
        }) => {
            assert!(waited >= Duration::from_millis(100));
            assert_eq!(active, 1);
            assert_eq!(idle, 0);
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(100));
    assert_eq!(pool.stats().snapshot().timeouts, 1);
}

#[test]
fn test_release_wakes_blocked_waiter() {
    let pool = Arc::new(create_pool(1, blocking(Some(Duration::from_millis(100)))));
    let held = pool.acquire().unwrap();
    let held_id = held.id();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire().map(|pooled| pooled.id()))
    };

    thread::sleep(Duration::from_millis(50));
    pool.release(held).unwrap();

    let woken = waiter.join().unwrap().unwrap();
    assert_eq!(woken, held_id);
    assert_eq!(pool.stats().snapshot().timeouts, 0);
}

#[test]
fn test_unbounded_block_waits_for_release() {
    let pool = Arc::new(create_pool(1, blocking(None)));
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire().map(|pooled| *pooled))
    };

    thread::sleep(Duration::from_millis(150));
    assert_eq!(pool.num_waiting(), 1);
    pool.release(held).unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), 0);
}

#[test]
fn test_shutdown_wakes_blocked_waiter() {
    let pool = Arc::new(create_pool(1, blocking(None)));
    let _held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire().map(|pooled| *pooled))
    };

    while pool.num_waiting() == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    pool.shutdown();

    assert!(matches!(waiter.join().unwrap(), Err(Error::Stopped)));
}

#[test]
fn test_block_policy_never_exceeds_cap() {
    let max_active = 3;
    let pool = Arc::new(create_pool(max_active, blocking(Some(Duration::from_secs(5)))));

    let mut handles = vec![];
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..25 {
                let pooled = pool.acquire().unwrap();
                assert!(pool.num_active() <= max_active);
                thread::yield_now();
                pool.release(pooled).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pool.num_active(), 0);
    assert!(pool.pool_size() <= max_active);
    assert!(pool.stats().snapshot().created <= max_active as u64);
}

// ============================================================================
// Grow
// ============================================================================

#[test]
fn test_grow_policy_creates_past_cap() {
    let pool = create_pool(2, ExhaustedAction::Grow);

    let held: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(pool.num_active(), 5);

    for pooled in held {
        pool.release(pooled).unwrap();
    }
    assert_eq!(pool.num_active(), 0);

    // The reaper shrinks the pool back under the cap.
    let report = pool.reap();
    assert_eq!(report.trimmed, 3);
    assert!(pool.pool_size() <= 2);
    pool.reap();
    assert!(pool.pool_size() <= 2);
}

#[test]
fn test_zero_max_wait_blocks_without_bound() {
    let pool = Arc::new(create_pool(1, blocking(Some(Duration::ZERO))));
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire().map(|pooled| *pooled))
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(pool.num_waiting(), 1);
    pool.release(held).unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), 0);
    assert_eq!(pool.stats().snapshot().timeouts, 0);
}
