use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardkit::ShardedLruCache;
use shardkit::policy::lru::LruShard;

const KEYSPACE: u64 = 16_384;

fn random_keys(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..KEYSPACE)).collect()
}

fn filled_cache(shards: usize, per_shard: usize) -> ShardedLruCache<u64, u64> {
    let cache = ShardedLruCache::with_shards(shards, per_shard);
    cache.put_all((0..KEYSPACE).map(|i| (i, i)));
    cache
}

fn bench_shard_put_get(c: &mut Criterion) {
    c.bench_function("lru_shard_put_get", |b| {
        b.iter_batched(
            || {
                let mut shard = LruShard::new(1024);
                for i in 0..1024u64 {
                    shard.put(i, i);
                }
                shard
            },
            |mut shard| {
                for i in 0..1024u64 {
                    shard.put(black_box(i + 10_000), i);
                    let _ = black_box(shard.get(&black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_sharded_get_hit(c: &mut Criterion) {
    let cache = filled_cache(16, 2048);
    let keys = random_keys(4096, 7);

    let mut group = c.benchmark_group("sharded_get_hit");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("single_thread", |b| {
        b.iter(|| {
            for key in &keys {
                let _ = black_box(cache.get(black_box(key)));
            }
        })
    });
    group.finish();
}

fn bench_sharded_eviction_churn(c: &mut Criterion) {
    c.bench_function("sharded_eviction_churn", |b| {
        b.iter_batched(
            || filled_cache(16, 64),
            |cache| {
                for i in 0..4096u64 {
                    cache.put(black_box(KEYSPACE + i), i);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

/// Runs `threads` workers over a shared cache and reports the slowest one.
fn run_contended(
    cache: &Arc<ShardedLruCache<u64, u64>>,
    threads: usize,
    iters: u64,
    write_every: usize,
) -> Duration {
    let start = Instant::now();
    thread::scope(|scope| {
        for tid in 0..threads {
            let cache = Arc::clone(cache);
            scope.spawn(move || {
                let keys = random_keys(1024, tid as u64);
                for _ in 0..iters {
                    for (i, key) in keys.iter().enumerate() {
                        if i % write_every == 0 {
                            cache.put(*key, i as u64);
                        } else {
                            let _ = black_box(cache.get(key));
                        }
                    }
                }
            });
        }
    });
    start.elapsed()
}

fn bench_contended_shard_counts(c: &mut Criterion) {
    let threads = thread::available_parallelism().map_or(4, |n| n.get()).min(8);

    let mut group = c.benchmark_group("sharded_contended_read_heavy");
    group.throughput(Throughput::Elements((threads * 1024) as u64));
    for shards in [1usize, 4, 16, 64] {
        let cache = Arc::new(filled_cache(shards, (KEYSPACE as usize / shards).max(1)));
        group.bench_with_input(BenchmarkId::from_parameter(shards), &shards, |b, _| {
            b.iter_custom(|iters| run_contended(&cache, threads, iters, 10))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("sharded_contended_write_heavy");
    group.throughput(Throughput::Elements((threads * 1024) as u64));
    for shards in [1usize, 16] {
        let cache = Arc::new(filled_cache(shards, 256));
        group.bench_with_input(BenchmarkId::from_parameter(shards), &shards, |b, _| {
            b.iter_custom(|iters| run_contended(&cache, threads, iters, 2))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_shard_put_get,
    bench_sharded_get_hit,
    bench_sharded_eviction_churn,
    bench_contended_shard_counts
);
criterion_main!(benches);
