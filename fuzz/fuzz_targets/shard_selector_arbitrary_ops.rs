#![no_main]

use libfuzzer_sys::fuzz_target;
use shardkit::ds::ShardSelector;

// Fuzz shard routing
//
// Shard counts are rounded up to a power of two; every key must land in
// range and on the same shard every time.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let requested = usize::from(data[0]) % 200;
    let selector: ShardSelector = ShardSelector::new(requested);

    let shards = selector.shard_count();
    assert!(shards.is_power_of_two());
    assert!(shards >= requested.max(1));
    assert!(shards < requested.max(1) * 2);

    for &byte in &data[1..] {
        let key = u32::from(byte);
        let shard = selector.shard_for_key(&key);
        assert!(shard < shards);
        assert_eq!(shard, selector.shard_for_key(&key));
    }

    for chunk in data[1..].chunks(2) {
        let key = format!("key_{:?}", chunk);
        let shard = selector.shard_for_key(key.as_str());
        assert!(shard < shards);
        assert_eq!(shard, selector.shard_for_key(key.as_str()));
    }
});
