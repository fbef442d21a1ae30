//! Example demonstrating the sharded LRU cache.
//!
//! Run with: cargo run --example basic_sharded
//! Set RUST_LOG=shardkit=debug to see shard allocation events.

use std::sync::Arc;
use std::thread;

use shardkit::builder::ShardedLruBuilder;
use shardkit::ShardedLruCache;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== ShardedLruCache Examples ===\n");

    // Example 1: eviction stays inside one shard
    println!("1. Two shards, one entry each");
    let cache: ShardedLruCache<u64, &str> = ShardedLruCache::with_shards(2, 1);
    let shard0: Vec<u64> = (0u64..).filter(|k| cache.shard_index(k) == 0).take(2).collect();
    let shard1 = (0u64..).find(|k| cache.shard_index(k) == 1).unwrap_or(0);

    cache.put(shard0[0], "A");
    cache.put(shard1, "B");
    println!("   after A, B: {}", cache);

    // C shares shard 0 with A, so A is evicted and B is untouched
    cache.put(shard0[1], "C");
    println!("   after C:    {}", cache);
    println!("   contains A? {}", cache.contains_key(&shard0[0]));
    println!("   contains B? {}", cache.contains_key(&shard1));
    println!();

    // Example 2: recency refresh
    println!("2. Recency within a shard");
    let cache: ShardedLruCache<&str, u32> = ShardedLruCache::with_shards(1, 3);
    cache.put("one", 1);
    cache.put("two", 2);
    cache.put("three", 3);
    cache.get(&"one");
    cache.put("four", 4);
    println!("   {}", cache);
    println!("   contains \"two\"? {} (least recently used)", cache.contains_key(&"two"));
    println!();

    // Example 3: many writers, bounded size
    println!("3. Concurrent writers");
    let cache: Arc<ShardedLruCache<u64, u64>> = Arc::new(
        ShardedLruBuilder::new(64)
            .shard_count(8)
            .per_shard_initial_size(64)
            .build(),
    );
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..1_000 {
                    cache.put(t * 10_000 + i, i);
                }
            })
        })
        .collect();
    for h in handles {
        let _ = h.join();
    }
    println!("   len = {} (max {})", cache.len(), cache.max_len());
    println!("   allocated shards = {}", cache.allocated_shards());
    println!("   {:?}", cache);
}
