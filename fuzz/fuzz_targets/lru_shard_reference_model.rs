#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;
use shardkit::policy::lru::LruShard;

// Fuzz a single LRU shard against a VecDeque reference (MRU at the front)
//
// Byte layout: [capacity, (op, key)*]. Checks eviction order, recency
// refresh on get/put/replace and the structural invariants after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let capacity = (usize::from(data[0]) % 16).max(1);
    let mut shard: LruShard<u8, u32> = LruShard::new(capacity);
    let mut reference: VecDeque<(u8, u32)> = VecDeque::with_capacity(capacity + 1);

    for (step, pair) in data[1..].chunks_exact(2).enumerate() {
        let (op, key) = (pair[0] % 5, pair[1] % 32);
        let value = step as u32;
        let pos = reference.iter().position(|(k, _)| *k == key);

        match op {
            0 => {
                let previous = shard.put(key, value);
                match pos {
                    Some(p) => {
                        let (_, old) = reference.remove(p).unwrap();
                        assert_eq!(previous, Some(old));
                    },
                    None => assert_eq!(previous, None),
                }
                reference.push_front((key, value));
                if reference.len() > capacity {
                    reference.pop_back();
                }
            },
            1 => {
                let got = shard.get(&key).copied();
                match pos {
                    Some(p) => {
                        let entry = reference.remove(p).unwrap();
                        assert_eq!(got, Some(entry.1));
                        reference.push_front(entry);
                    },
                    None => assert_eq!(got, None),
                }
            },
            2 => {
                let removed = shard.remove(&key);
                assert_eq!(removed, pos.and_then(|p| reference.remove(p)).map(|(_, v)| v));
            },
            3 => {
                let existing = shard.put_if_absent(key, value).copied();
                match pos {
                    Some(p) => assert_eq!(existing, Some(reference[p].1)),
                    None => {
                        assert_eq!(existing, None);
                        reference.push_front((key, value));
                        if reference.len() > capacity {
                            reference.pop_back();
                        }
                    },
                }
            },
            _ => {
                let previous = shard.replace(&key, value);
                match pos {
                    Some(p) => {
                        let (_, old) = reference.remove(p).unwrap();
                        assert_eq!(previous, Some(old));
                        reference.push_front((key, value));
                    },
                    None => assert_eq!(previous, None),
                }
            },
        }

        shard.check_invariants().unwrap();
        assert_eq!(shard.len(), reference.len());
        let order: Vec<(u8, u32)> = shard.iter().map(|(k, v)| (*k, *v)).collect();
        assert!(order.iter().eq(reference.iter()));
    }
});
