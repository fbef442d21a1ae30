//! Example using the cache as a lookup memoizer behind `ConcurrentCache`.
//!
//! Run with: cargo run --example memoizer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use shardkit::traits::ConcurrentCache;
use shardkit::ShardedLruCache;

/// Resolves type names to a (pretend) expensive descriptor.
struct Resolver<C> {
    cache: C,
    misses: AtomicUsize,
}

impl<C: ConcurrentCache<String, Arc<str>>> Resolver<C> {
    fn resolve(&self, name: &str) -> Arc<str> {
        self.cache.get_or_insert_with(name.to_string(), || {
            self.misses.fetch_add(1, Ordering::Relaxed);
            Arc::from(format!("descriptor<{name}>"))
        })
    }
}

fn main() {
    let resolver = Arc::new(Resolver {
        cache: ShardedLruCache::<String, Arc<str>>::new(32),
        misses: AtomicUsize::new(0),
    });

    let names = ["Integer", "String", "Boolean", "Duration", "Path"];
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for _ in 0..100 {
                    for name in names {
                        let _ = resolver.resolve(name);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        let _ = h.join();
    }

    println!("resolved {} names", resolver.cache.len());
    println!("computed {} descriptors", resolver.misses.load(Ordering::Relaxed));
    println!("String -> {}", resolver.resolve("String"));
}
