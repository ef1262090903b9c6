//! Bounded checkout caches for temporary GPU resources.
//!
//! A [`ResourceCache`] hands out resources (framebuffers, compiled programs)
//! matching a description key and takes them back when the borrower is done.
//! Unlike an LRU map it can hold several live entries for the same key at
//! once, which is what ping-pong passes need:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  ResourceCache<K, V>                  │
//! │                                                       │
//! │  entries: SlotMap<Entry>   Available(V) | CheckedOut  │
//! │                                                       │
//! │  checkout(&K) → Receipt   reuse ▸ allocate ▸ evict    │
//! │  Receipt::return_to_cache  (or drop)                  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Only available entries are ever evicted; an entry behind a live
//! [`Receipt`] is never touched, whatever its key. A receipt can be returned
//! only once because returning consumes it:
//!
//! ```compile_fail
//! use prism_core::cache::{ResourceAllocator, ResourceCache};
//!
//! struct Counter;
//! impl ResourceAllocator<u32, u32> for Counter {
//!     fn allocate(&mut self, key: &u32) -> prism_core::Result<u32> {
//!         Ok(*key)
//!     }
//! }
//!
//! let cache = ResourceCache::new(2, Counter);
//! let receipt = cache.checkout(&1).unwrap();
//! receipt.return_to_cache().unwrap();
//! receipt.return_to_cache().unwrap();
//! ```

use std::cell::RefCell;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use slotmap::{DefaultKey, SlotMap};

use crate::error::{PrismError, Result};

/// Creates, resets and destroys the values held by a [`ResourceCache`].
pub trait ResourceAllocator<K, V> {
    /// Creates a new value for `key`.
    fn allocate(&mut self, key: &K) -> Result<V>;

    /// Prepares a previously returned value before it is handed out again.
    fn reuse(&mut self, _key: &K, _value: &mut V) {}

    /// Destroys a value that is being evicted.
    fn release(&mut self, _key: K, _value: V) {}
}

/// Allocation counters for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Values created by the allocator.
    pub allocations: u64,
    /// Checkouts satisfied by an available entry.
    pub reuses: u64,
    /// Available entries destroyed to make room.
    pub evictions: u64,
}

enum EntryState<V> {
    Available(V),
    CheckedOut,
}

struct Entry<K, V> {
    key: K,
    state: EntryState<V>,
    /// Tick of the last return, used to pick eviction victims.
    returned_at: u64,
}

impl<K, V> Entry<K, V> {
    fn is_available(&self) -> bool {
        matches!(self.state, EntryState::Available(_))
    }
}

struct CacheInner<K, V> {
    allocator: Box<dyn ResourceAllocator<K, V>>,
    entries: SlotMap<DefaultKey, Entry<K, V>>,
    capacity: usize,
    tick: u64,
    stats: CacheStats,
}

impl<K: Clone + Eq + Hash, V> CacheInner<K, V> {
    fn outstanding(&self) -> usize {
        self.entries.values().filter(|e| !e.is_available()).count()
    }

    /// Most recently returned available entry for `key`.
    fn find_available(&self, key: &K) -> Option<DefaultKey> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_available() && e.key == *key)
            .max_by_key(|(_, e)| e.returned_at)
            .map(|(id, _)| id)
    }

    /// Least recently returned available entry of any key.
    fn find_victim(&self) -> Option<DefaultKey> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_available())
            .min_by_key(|(_, e)| e.returned_at)
            .map(|(id, _)| id)
    }

    /// Removes an available entry and hands its value to the allocator.
    /// Checked-out entries are left alone.
    fn evict(&mut self, id: DefaultKey) {
        if !self.entries.get(id).is_some_and(Entry::is_available) {
            return;
        }
        if let Some(Entry {
            key,
            state: EntryState::Available(value),
            ..
        }) = self.entries.remove(id)
        {
            self.allocator.release(key, value);
        }
    }

    fn take(&mut self, key: &K) -> Result<(DefaultKey, V)> {
        if let Some(id) = self.find_available(key) {
            if let Some(entry) = self.entries.get_mut(id) {
                if let EntryState::Available(mut value) =
                    std::mem::replace(&mut entry.state, EntryState::CheckedOut)
                {
                    self.allocator.reuse(key, &mut value);
                    self.stats.reuses += 1;
                    return Ok((id, value));
                }
            }
        }

        if self.entries.len() >= self.capacity {
            let Some(victim) = self.find_victim() else {
                return Err(PrismError::CacheCapacityExceeded {
                    capacity: self.capacity,
                });
            };
            log::debug!("evicting cache entry {victim:?} to make room");
            self.evict(victim);
            self.stats.evictions += 1;
        }

        let value = self.allocator.allocate(key)?;
        self.stats.allocations += 1;
        let id = self.entries.insert(Entry {
            key: key.clone(),
            state: EntryState::CheckedOut,
            returned_at: 0,
        });
        Ok((id, value))
    }

    fn give_back(&mut self, id: DefaultKey, value: V) -> Result<()> {
        self.tick += 1;
        match self.entries.get_mut(id) {
            Some(entry) if !entry.is_available() => {
                entry.state = EntryState::Available(value);
                entry.returned_at = self.tick;
                Ok(())
            }
            _ => Err(PrismError::ReceiptNotOutstanding),
        }
    }
}

/// A bounded cache of reusable resources keyed by description.
///
/// Single-threaded; the allocator must not call back into the cache.
pub struct ResourceCache<K, V> {
    inner: RefCell<CacheInner<K, V>>,
}

impl<K: Clone + Eq + Hash, V> ResourceCache<K, V> {
    /// Creates a cache holding at most `capacity` live entries.
    pub fn new(capacity: usize, allocator: impl ResourceAllocator<K, V> + 'static) -> Self {
        Self {
            inner: RefCell::new(CacheInner {
                allocator: Box::new(allocator),
                entries: SlotMap::new(),
                capacity,
                tick: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Borrows a resource matching `key`.
    ///
    /// Reuses an available entry for `key` if there is one, otherwise
    /// allocates a new one, evicting the least recently returned available
    /// entry when the cache is full. Fails with
    /// [`PrismError::CacheCapacityExceeded`] when every entry is checked out.
    pub fn checkout(&self, key: &K) -> Result<Receipt<'_, K, V>> {
        let (entry, value) = self.inner.borrow_mut().take(key).map_err(|err| {
            log::warn!("cache checkout failed: {err}");
            err
        })?;
        Ok(Receipt {
            cache: self,
            key: key.clone(),
            entry,
            value: Some(value),
        })
    }

    /// Runs `f` with a borrowed resource and returns it afterwards.
    pub fn with_checkout<T, E, F>(&self, key: &K, f: F) -> std::result::Result<T, E>
    where
        E: From<PrismError>,
        F: FnOnce(&mut V) -> std::result::Result<T, E>,
    {
        let mut receipt = self.checkout(key)?;
        let result = f(receipt.value_mut());
        receipt.return_to_cache()?;
        result
    }

    /// Returns the maximum number of live entries.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// Returns the number of allocated entries, checked out or not.
    pub fn live_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Returns the number of entries behind a live receipt.
    pub fn outstanding_count(&self) -> usize {
        self.inner.borrow().outstanding()
    }

    /// Returns the number of entries ready for reuse or eviction.
    pub fn available_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.entries.len() - inner.outstanding()
    }

    /// Returns the allocation counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.borrow().stats
    }

    /// Releases every available entry. Checked-out entries are kept.
    pub fn trim(&self) {
        let mut inner = self.inner.borrow_mut();
        let available: Vec<DefaultKey> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_available())
            .map(|(id, _)| id)
            .collect();
        for id in available {
            inner.evict(id);
        }
    }

    /// Releases every entry.
    ///
    /// Fails with [`PrismError::CacheOutstanding`] while any receipt is live.
    pub fn clear(&self) -> Result<()> {
        let outstanding = self.outstanding_count();
        if outstanding > 0 {
            return Err(PrismError::CacheOutstanding { outstanding });
        }
        self.trim();
        Ok(())
    }

    fn finish(&self, entry: DefaultKey, value: V) -> Result<()> {
        self.inner.borrow_mut().give_back(entry, value)
    }
}

impl<K, V> std::fmt::Debug for ResourceCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("ResourceCache")
                .field("capacity", &inner.capacity)
                .field("entries", &inner.entries.len())
                .field("stats", &inner.stats)
                .finish(),
            Err(_) => f.write_str("ResourceCache { <borrowed> }"),
        }
    }
}

/// A single-use token for a borrowed cache entry.
///
/// The entry goes back to the cache exactly once: either through
/// [`return_to_cache`](Self::return_to_cache), or automatically when the
/// receipt is dropped (early return, `?`, unwinding).
pub struct Receipt<'c, K: Clone + Eq + Hash, V> {
    cache: &'c ResourceCache<K, V>,
    key: K,
    entry: DefaultKey,
    value: Option<V>,
}

impl<K: Clone + Eq + Hash, V> Receipt<'_, K, V> {
    /// Returns the key this entry was checked out for.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the borrowed resource.
    pub fn value(&self) -> &V {
        self.value.as_ref().expect("receipt value present until returned")
    }

    /// Returns the borrowed resource mutably.
    pub fn value_mut(&mut self) -> &mut V {
        self.value.as_mut().expect("receipt value present until returned")
    }

    /// Hands the entry back to the cache.
    pub fn return_to_cache(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match self.value.take() {
            Some(value) => self.cache.finish(self.entry, value),
            None => Err(PrismError::ReceiptNotOutstanding),
        }
    }
}

impl<K: Clone + Eq + Hash, V> Deref for Receipt<'_, K, V> {
    type Target = V;

    fn deref(&self) -> &V {
        self.value()
    }
}

impl<K: Clone + Eq + Hash, V> DerefMut for Receipt<'_, K, V> {
    fn deref_mut(&mut self) -> &mut V {
        self.value_mut()
    }
}

impl<K: Clone + Eq + Hash, V> Drop for Receipt<'_, K, V> {
    fn drop(&mut self) {
        if self.value.is_some() {
            if let Err(err) = self.release() {
                log::error!("failed to return dropped receipt: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Desc {
        width: u32,
        height: u32,
    }

    #[derive(Debug)]
    struct Target {
        id: u32,
        desc: Desc,
        dirty: bool,
    }

    #[derive(Default)]
    struct Counts {
        next_id: Cell<u32>,
        released: Cell<u32>,
        reused: Cell<u32>,
    }

    struct TargetAllocator(Rc<Counts>);

    impl ResourceAllocator<Desc, Target> for TargetAllocator {
        fn allocate(&mut self, key: &Desc) -> Result<Target> {
            let id = self.0.next_id.get();
            self.0.next_id.set(id + 1);
            Ok(Target {
                id,
                desc: key.clone(),
                dirty: false,
            })
        }

        fn reuse(&mut self, _key: &Desc, value: &mut Target) {
            value.dirty = false;
            self.0.reused.set(self.0.reused.get() + 1);
        }

        fn release(&mut self, _key: Desc, _value: Target) {
            self.0.released.set(self.0.released.get() + 1);
        }
    }

    fn cache(capacity: usize) -> (ResourceCache<Desc, Target>, Rc<Counts>) {
        let counts = Rc::new(Counts::default());
        (
            ResourceCache::new(capacity, TargetAllocator(counts.clone())),
            counts,
        )
    }

    fn desc(size: u32) -> Desc {
        Desc {
            width: size,
            height: size,
        }
    }

    #[test]
    fn test_roundtrip_reuses_without_allocating() {
        let (cache, counts) = cache(4);
        let first = cache.checkout(&desc(256)).unwrap();
        let id = first.id;
        first.return_to_cache().unwrap();

        let second = cache.checkout(&desc(256)).unwrap();
        assert_eq!(second.id, id);
        assert_eq!(second.desc, desc(256));
        assert_eq!(counts.next_id.get(), 1);
        assert_eq!(counts.reused.get(), 1);
        assert_eq!(cache.stats().allocations, 1);
        assert_eq!(cache.stats().reuses, 1);
    }

    #[test]
    fn test_reuse_resets_value() {
        let (cache, _) = cache(1);
        let mut receipt = cache.checkout(&desc(8)).unwrap();
        receipt.dirty = true;
        receipt.return_to_cache().unwrap();
        assert!(!cache.checkout(&desc(8)).unwrap().dirty);
    }

    #[test]
    fn test_same_key_ping_pong() {
        let (cache, _) = cache(4);
        let ping = cache.checkout(&desc(512)).unwrap();
        let pong = cache.checkout(&desc(512)).unwrap();
        assert_ne!(ping.id, pong.id);
        assert_eq!(cache.outstanding_count(), 2);
        drop(ping);
        drop(pong);
        assert_eq!(cache.outstanding_count(), 0);
        assert_eq!(cache.available_count(), 2);
    }

    #[test]
    fn test_capacity_one_never_hands_out_borrowed_entry() {
        let (cache, counts) = cache(1);
        let first = cache.checkout(&desc(64)).unwrap();
        assert!(matches!(
            cache.checkout(&desc(64)),
            Err(PrismError::CacheCapacityExceeded { capacity: 1 })
        ));
        assert!(matches!(
            cache.checkout(&desc(32)),
            Err(PrismError::CacheCapacityExceeded { capacity: 1 })
        ));
        assert_eq!(first.id, 0);
        assert_eq!(counts.released.get(), 0);
        assert_eq!(cache.live_count(), 1);
    }

    #[test]
    fn test_evicts_least_recently_returned() {
        let (cache, counts) = cache(2);
        let a = cache.checkout(&desc(1)).unwrap();
        let b = cache.checkout(&desc(2)).unwrap();
        let (a_id, b_id) = (a.id, b.id);
        a.return_to_cache().unwrap();
        b.return_to_cache().unwrap();

        // desc(1) was returned first, so it is the victim.
        let c = cache.checkout(&desc(3)).unwrap();
        assert_eq!(counts.released.get(), 1);
        assert_eq!(cache.stats().evictions, 1);
        drop(c);

        let b_again = cache.checkout(&desc(2)).unwrap();
        assert_eq!(b_again.id, b_id);
        drop(b_again);
        let a_again = cache.checkout(&desc(1)).unwrap();
        assert_ne!(a_again.id, a_id);
    }

    #[test]
    fn test_eviction_skips_checked_out_entries() {
        let (cache, _) = cache(2);
        let held = cache.checkout(&desc(1)).unwrap();
        let other = cache.checkout(&desc(2)).unwrap();
        other.return_to_cache().unwrap();

        let fresh = cache.checkout(&desc(3)).unwrap();
        assert_eq!(held.desc, desc(1));
        assert_eq!(fresh.desc, desc(3));
        assert!(cache.checkout(&desc(4)).is_err());
    }

    #[test]
    fn test_drop_returns_on_error_path() {
        let (cache, _) = cache(1);
        let result: Result<()> = (|| {
            let _receipt = cache.checkout(&desc(16))?;
            Err(PrismError::AllocationFailed("pass failed".into()))
        })();
        assert!(result.is_err());
        assert_eq!(cache.outstanding_count(), 0);
        assert!(cache.checkout(&desc(16)).is_ok());
    }

    #[test]
    fn test_drop_returns_on_panic() {
        let (cache, _) = cache(1);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _receipt = cache.checkout(&desc(16)).unwrap();
            panic!("pass exploded");
        }));
        assert!(outcome.is_err());
        assert_eq!(cache.outstanding_count(), 0);
    }

    #[test]
    fn test_with_checkout_returns_on_error() {
        let (cache, _) = cache(1);
        let result: Result<u32> = cache.with_checkout(&desc(4), |_target| {
            Err(PrismError::AllocationFailed("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(cache.outstanding_count(), 0);
        let id = cache
            .with_checkout(&desc(4), |target| Ok::<_, PrismError>(target.id))
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_stale_return_is_rejected() {
        let (cache, _) = cache(1);
        let mut receipt = cache.checkout(&desc(2)).unwrap();
        receipt.release().unwrap();
        assert!(matches!(
            receipt.release(),
            Err(PrismError::ReceiptNotOutstanding)
        ));
    }

    #[test]
    fn test_return_of_stale_entry_is_rejected() {
        let spare = || Target {
            id: 99,
            desc: desc(2),
            dirty: false,
        };
        let (cache, _) = cache(1);
        let receipt = cache.checkout(&desc(2)).unwrap();
        let entry = receipt.entry;
        receipt.return_to_cache().unwrap();

        // Still cached, but no longer checked out.
        assert!(matches!(
            cache.finish(entry, spare()),
            Err(PrismError::ReceiptNotOutstanding)
        ));

        // Evicted, and its key is not handed to the replacement entry.
        cache.trim();
        assert!(matches!(
            cache.finish(entry, spare()),
            Err(PrismError::ReceiptNotOutstanding)
        ));
        let fresh = cache.checkout(&desc(2)).unwrap();
        assert_ne!(fresh.entry, entry);
        assert_eq!(cache.live_count(), 1);
    }

    #[test]
    fn test_clear_requires_no_outstanding() {
        let (cache, counts) = cache(3);
        let held = cache.checkout(&desc(1)).unwrap();
        cache.checkout(&desc(2)).unwrap().return_to_cache().unwrap();
        assert!(matches!(
            cache.clear(),
            Err(PrismError::CacheOutstanding { outstanding: 1 })
        ));
        cache.trim();
        assert_eq!(counts.released.get(), 1);
        assert_eq!(cache.live_count(), 1);
        drop(held);
        cache.clear().unwrap();
        assert_eq!(cache.live_count(), 0);
    }

    #[test]
    fn test_allocation_failure_leaves_no_entry() {
        struct Failing;
        impl ResourceAllocator<u32, u32> for Failing {
            fn allocate(&mut self, _key: &u32) -> Result<u32> {
                Err(PrismError::AllocationFailed("out of memory".into()))
            }
        }
        let cache = ResourceCache::new(1, Failing);
        assert!(matches!(
            cache.checkout(&7),
            Err(PrismError::AllocationFailed(_))
        ));
        assert_eq!(cache.live_count(), 0);
    }
}
