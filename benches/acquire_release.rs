// Pool throughput benchmarks.
//
// Measures raw acquire/release overhead with a zero-cost resource
// (no I/O, instant create and destroy).

use std::convert::Infallible;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use synchronized_pool::{ExhaustedAction, Lifecycle, PoolConfig, SynchronizedPool};

struct NoOp;

impl Lifecycle for NoOp {
    type Resource = u64;
    type Error = Infallible;

    fn create(&self) -> Result<u64, Infallible> {
        Ok(0)
    }
}

fn pool_config(max_active: usize) -> PoolConfig {
    PoolConfig {
        max_active,
        max_idle: max_active,
        max_idle_time: None,
        exhausted_action: ExhaustedAction::Block {
            max_wait: Some(Duration::from_secs(5)),
        },
        reaper_interval: None,
        ..Default::default()
    }
}

fn single_thread_throughput(c: &mut Criterion) {
    let pool = SynchronizedPool::new(NoOp, pool_config(64)).unwrap();

    // Warm up so subsequent acquires reuse the idle object.
    drop(pool.acquire_guard().unwrap());

    c.bench_function("single_thread_acquire_release", |b| {
        b.iter(|| {
            let pooled = pool.acquire().unwrap();
            black_box(*pooled);
            pool.release(pooled).unwrap();
        });
    });

    c.bench_function("single_thread_guard", |b| {
        b.iter(|| {
            let guard = pool.acquire_guard().unwrap();
            black_box(*guard);
        });
    });
}

fn contended_throughput(c: &mut Criterion) {
    // Small pool to create contention.
    let pool = Arc::new(SynchronizedPool::new(NoOp, pool_config(4)).unwrap());

    c.bench_function("contended_acquire_release_4slots_8threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let pool = Arc::clone(&pool);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let guard = pool.acquire_guard().unwrap();
                            black_box(*guard);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

criterion_group!(benches, single_thread_throughput, contended_throughput);
criterion_main!(benches);
