//! Integration tests for the resource cache.

use std::collections::HashSet;

use prism_core::*;
use proptest::prelude::*;

/// Hands out `(key, serial)` pairs so every allocation is distinguishable.
#[derive(Default)]
struct Serials {
    next: u64,
}

impl ResourceAllocator<u8, (u8, u64)> for Serials {
    fn allocate(&mut self, key: &u8) -> Result<(u8, u64)> {
        self.next += 1;
        Ok((*key, self.next))
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Checkout(u8),
    Return(usize),
    Drop(usize),
    Trim,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..4).prop_map(Op::Checkout),
        2 => any::<usize>().prop_map(Op::Return),
        1 => any::<usize>().prop_map(Op::Drop),
        1 => Just(Op::Trim),
    ]
}

proptest! {
    #[test]
    fn prop_checkout_invariants(
        capacity in 1usize..6,
        ops in proptest::collection::vec(op(), 0..60),
    ) {
        let cache = ResourceCache::new(capacity, Serials::default());
        let mut held: Vec<Receipt<'_, u8, (u8, u64)>> = Vec::new();

        for op in ops {
            match op {
                Op::Checkout(key) => {
                    let full = cache.outstanding_count() == capacity;
                    match cache.checkout(&key) {
                        Ok(receipt) => {
                            prop_assert!(!full);
                            prop_assert_eq!(receipt.value().0, key);
                            prop_assert_eq!(*receipt.key(), key);
                            held.push(receipt);
                        }
                        Err(err) => {
                            prop_assert!(full, "checkout failed with room left: {err}");
                            let is_capacity = matches!(err, PrismError::CacheCapacityExceeded { .. });
                            prop_assert!(is_capacity);
                        }
                    }
                }
                Op::Return(i) if !held.is_empty() => {
                    let receipt = held.swap_remove(i % held.len());
                    prop_assert!(receipt.return_to_cache().is_ok());
                }
                Op::Drop(i) if !held.is_empty() => {
                    drop(held.swap_remove(i % held.len()));
                }
                Op::Trim => cache.trim(),
                Op::Return(_) | Op::Drop(_) => {}
            }

            prop_assert!(cache.live_count() <= capacity);
            prop_assert_eq!(cache.outstanding_count(), held.len());
            prop_assert_eq!(
                cache.live_count(),
                cache.outstanding_count() + cache.available_count()
            );
            let serials: HashSet<u64> = held.iter().map(|r| r.value().1).collect();
            prop_assert_eq!(serials.len(), held.len(), "two receipts share a resource");
        }

        drop(held);
        prop_assert_eq!(cache.outstanding_count(), 0);
        prop_assert!(cache.clear().is_ok());
        prop_assert_eq!(cache.live_count(), 0);
    }
}

#[test]
fn test_ping_pong_same_key() {
    let cache = ResourceCache::new(2, Serials::default());
    let a = cache.checkout(&1).unwrap();
    let b = cache.checkout(&1).unwrap();
    assert_ne!(a.value().1, b.value().1);
    let (sa, sb) = (a.value().1, b.value().1);
    a.return_to_cache().unwrap();
    b.return_to_cache().unwrap();

    // Both come back from the cache on the next frame.
    let a = cache.checkout(&1).unwrap();
    let b = cache.checkout(&1).unwrap();
    let reused: HashSet<u64> = [a.value().1, b.value().1].into_iter().collect();
    assert_eq!(reused, [sa, sb].into_iter().collect());
    assert_eq!(cache.stats().allocations, 2);
    assert_eq!(cache.stats().reuses, 2);
}

#[test]
fn test_capacity_one_under_pressure() {
    let cache = ResourceCache::new(1, Serials::default());
    let held = cache.checkout(&0).unwrap();
    assert!(matches!(
        cache.checkout(&1),
        Err(PrismError::CacheCapacityExceeded { capacity: 1 })
    ));
    held.return_to_cache().unwrap();
    let other = cache.checkout(&1).unwrap();
    assert_eq!(other.value().0, 1);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_with_checkout_returns_on_error() {
    let cache = ResourceCache::new(1, Serials::default());
    let result: Result<()> = cache.with_checkout(&3, |_| Err(PrismError::InvalidOptions("x".into())));
    assert!(result.is_err());
    assert_eq!(cache.outstanding_count(), 0);
    assert_eq!(cache.available_count(), 1);
}
