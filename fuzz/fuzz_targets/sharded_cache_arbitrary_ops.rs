#![no_main]

use libfuzzer_sys::fuzz_target;
use shardkit::ShardedLruCache;

// Fuzz arbitrary operation sequences against a sharded cache
//
// Byte layout: [shards, capacity, (op, key, value)*]. After every step no
// shard may exceed its capacity and every shard must pass its structural
// checks.
fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }

    let shards = usize::from(data[0] % 8) + 1;
    let capacity = usize::from(data[1] % 8) + 1;
    let cache: ShardedLruCache<u8, u8> = ShardedLruCache::with_shards(shards, capacity);

    for chunk in data[2..].chunks_exact(3) {
        let (op, key, value) = (chunk[0] % 10, chunk[1], chunk[2]);
        match op {
            0 | 1 => {
                cache.put(key, value);
                assert_eq!(cache.peek(&key), Some(value));
            },
            2 => {
                let existing = cache.peek(&key);
                let returned = cache.put_if_absent(key, value);
                assert_eq!(returned, existing);
            },
            3 | 4 => {
                if let Some(v) = cache.get(&key) {
                    assert!(cache.contains_key(&key));
                    assert!(cache.contains_value(&v));
                }
            },
            5 => {
                let existing = cache.peek(&key);
                assert_eq!(cache.remove(&key), existing);
                assert!(!cache.contains_key(&key));
            },
            6 => {
                let existing = cache.peek(&key);
                assert_eq!(cache.replace(&key, value), existing);
            },
            7 => {
                let matches = cache.peek(&key) == Some(value);
                assert_eq!(cache.remove_if(&key, &value), matches);
            },
            8 => {
                let keys = cache.keys();
                assert_eq!(keys.len(), cache.len());
                assert_eq!(cache.entries().len(), cache.values().len());
            },
            _ => {
                cache.clear();
                assert!(cache.is_empty());
            },
        }

        for shard in 0..cache.shard_count() {
            assert!(cache.shard_len(shard).unwrap_or(0) <= capacity);
        }
        assert!(cache.len() <= cache.max_len());
        cache.check_invariants().unwrap();
    }
});
