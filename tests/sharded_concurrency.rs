// ==============================================
// SHARDED CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// Multi-threaded stress tests for ShardedLruCache. These need real threads
// racing on the same shards and cannot live inline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardkit::ShardedLruCache;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ==============================================
// Random Mixed Workload
// ==============================================
//
// Threads hammer a small keyspace with put/get/remove so every shard sees
// contention, evictions and removals at once.

mod mixed_workload {
    use super::*;

    #[test]
    fn random_ops_finish_within_capacity() {
        init_tracing();
        let num_threads = 8;
        let ops_per_thread = 5_000;

        let cache: Arc<ShardedLruCache<u64, u64>> = Arc::new(ShardedLruCache::with_shards(4, 16));
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|tid| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(tid as u64);
                    barrier.wait();
                    for _ in 0..ops_per_thread {
                        let key = rng.gen_range(0..256u64);
                        match rng.gen_range(0..10) {
                            0..=3 => {
                                cache.put(key, key * 2);
                            },
                            4..=7 => {
                                if let Some(value) = cache.get(&key) {
                                    assert_eq!(value, key * 2, "value for key {key} corrupted");
                                }
                            },
                            8 => {
                                cache.remove(&key);
                            },
                            _ => {
                                cache.put_if_absent(key, key * 2);
                            },
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert!(cache.len() <= cache.max_len());
        for shard in 0..cache.shard_count() {
            assert!(cache.shard_len(shard).unwrap() <= cache.per_shard_capacity());
        }
        cache.check_invariants().unwrap();
    }
}

// ==============================================
// Capacity Under Contention
// ==============================================
//
// Every thread inserts distinct keys; no interleaving may leave a shard
// above its capacity.

mod capacity_under_contention {
    use super::*;

    #[test]
    fn concurrent_inserts_respect_per_shard_capacity() {
        let capacity = 10;
        let num_threads = 16;
        let inserts_per_thread = 20;

        for _ in 0..50 {
            let cache: Arc<ShardedLruCache<u64, u64>> =
                Arc::new(ShardedLruCache::with_shards(2, capacity));
            let barrier = Arc::new(Barrier::new(num_threads));

            let handles: Vec<_> = (0..num_threads)
                .map(|tid| {
                    let cache = cache.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        for i in 0..inserts_per_thread {
                            let key = (tid * inserts_per_thread + i) as u64;
                            cache.put(key, key);
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            assert!(
                cache.len() <= 2 * capacity,
                "len {} exceeded max_len {}",
                cache.len(),
                cache.max_len()
            );
            cache.check_invariants().unwrap();
        }
    }
}

// ==============================================
// Readers During Writes
// ==============================================
//
// Readers on one shard must always see a complete value, whichever side of
// a concurrent write they land on.

mod readers_during_writes {
    use super::*;

    #[test]
    fn readers_never_observe_torn_values() {
        let cache: Arc<ShardedLruCache<u64, (u64, u64)>> =
            Arc::new(ShardedLruCache::with_shards(1, 4));
        cache.put(0, (0, 0));

        let stop = Arc::new(AtomicBool::new(false));
        let reads = Arc::new(AtomicUsize::new(0));

        let writer = {
            let cache = cache.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut n = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    n += 1;
                    cache.put(0, (n, n));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let stop = stop.clone();
                let reads = reads.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        if let Some((a, b)) = cache.get(&0) {
                            assert_eq!(a, b, "read a half-written value");
                        }
                        reads.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert!(reads.load(Ordering::Relaxed) > 0);
    }
}

// ==============================================
// Lazy Allocation Race
// ==============================================
//
// Many first writers race on the same unallocated shard. A second
// allocation would drop earlier inserts.

mod lazy_allocation {
    use super::*;

    #[test]
    fn first_writers_share_one_shard() {
        for _ in 0..100 {
            let cache: Arc<ShardedLruCache<u64, u64>> =
                Arc::new(ShardedLruCache::with_shards(1, 64));
            let num_threads = 8;
            let barrier = Arc::new(Barrier::new(num_threads));

            let handles: Vec<_> = (0..num_threads as u64)
                .map(|key| {
                    let cache = cache.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        cache.put(key, key);
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(cache.len(), num_threads);
            assert_eq!(cache.allocated_shards(), 1);
        }
    }
}

// ==============================================
// Memoizer Under Contention
// ==============================================

mod memoizer {
    use super::*;

    #[test]
    fn get_or_insert_with_returns_one_agreed_value() {
        let cache: Arc<ShardedLruCache<u64, usize>> = Arc::new(ShardedLruCache::new(32));
        let num_threads = 8;
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|tid| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_insert_with(42, || tid)
                })
            })
            .collect();

        let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = cache.get(&42).unwrap();
        assert!(seen.iter().all(|&v| v == cached), "callers disagreed: {seen:?}");
    }
}

// ==============================================
// Aggregates During Writes
// ==============================================
//
// len/keys/clear visit shards one at a time while writers keep going; they
// must neither deadlock nor report more than max_len entries.

mod aggregates_during_writes {
    use super::*;

    #[test]
    fn aggregates_stay_bounded() {
        let cache: Arc<ShardedLruCache<u64, u64>> = Arc::new(ShardedLruCache::with_shards(8, 8));
        let stop = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..4u64)
            .map(|tid| {
                let cache = cache.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    let mut i = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        cache.put(tid * 1_000_000 + i, i);
                        i += 1;
                    }
                })
            })
            .collect();

        for round in 0..200 {
            assert!(cache.len() <= cache.max_len());
            assert!(cache.keys().len() <= cache.max_len());
            assert!(cache.entries().len() <= cache.max_len());
            if round % 50 == 0 {
                cache.clear();
            }
        }

        stop.store(true, Ordering::Relaxed);
        for w in writers {
            w.join().unwrap();
        }
        cache.check_invariants().unwrap();
    }
}
