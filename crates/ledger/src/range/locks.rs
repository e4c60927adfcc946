//! Keyed mutual exclusion.
//!
//! One mutex per live key, created on first use and dropped once nobody
//! holds or waits on it, so the table only grows with concurrent activity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

pub(crate) struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// The lock is released when `f` returns or unwinds. A lock poisoned by
    /// a panicking holder is still acquired: the guarded data is `()`, and
    /// stored state is only written after a mutation fully succeeds.
    pub(crate) fn with<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let slot = Slot {
            locks: self,
            key,
            mutex: self.checkout(key),
        };
        let _guard = slot.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Run `f` while holding the locks of every key in `keys`.
    ///
    /// `keys` must be strictly ascending. Every multi-key caller takes locks
    /// in that one global order, so two of them never deadlock.
    pub(crate) fn with_all<R>(&self, keys: &[K], f: impl FnOnce() -> R) -> R
    where
        K: Ord,
    {
        debug_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        match keys.split_first() {
            None => f(),
            Some((first, rest)) => self.with(first, || self.with_all(rest, f)),
        }
    }

    fn checkout(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// A checked-out slot. Declared before the guard so it drops after it.
struct Slot<'a, K: Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: &'a K,
    mutex: Arc<Mutex<()>>,
}

impl<K: Eq + Hash> Drop for Slot<'_, K> {
    fn drop(&mut self) {
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Table + this handle: nobody else holds or waits on it.
        if Arc::strong_count(&self.mutex) == 2 {
            slots.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn slot_removed_after_use() {
        let locks = KeyedLocks::new();
        assert_eq!(locks.with(&"a", || 7), 7);
        assert_eq!(locks.live(), 0);
    }

    #[test]
    fn slot_released_on_panic() {
        let locks = KeyedLocks::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with(&"a", || panic!("boom"))
        }));
        assert!(result.is_err());
        assert_eq!(locks.live(), 0);
        assert_eq!(locks.with(&"a", || 1), 1);
    }

    #[test]
    fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        locks.with(&"k", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.live(), 0);
    }

    #[test]
    fn with_all_holds_every_key() {
        let locks = KeyedLocks::new();
        let counters: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();
        let max_seen = AtomicUsize::new(0);

        thread::scope(|s| {
            for t in 0..6usize {
                let (locks, counters, max_seen) = (&locks, &counters, &max_seen);
                s.spawn(move || {
                    // Overlapping key sets: {t%4, (t+1)%4}.
                    let mut keys = vec![t % 4, (t + 1) % 4];
                    keys.sort();
                    for _ in 0..50 {
                        locks.with_all(&keys, || {
                            for &k in &keys {
                                let now = counters[k].fetch_add(1, Ordering::SeqCst) + 1;
                                max_seen.fetch_max(now, Ordering::SeqCst);
                            }
                            thread::yield_now();
                            for &k in &keys {
                                counters[k].fetch_sub(1, Ordering::SeqCst);
                            }
                        });
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.live(), 0);
    }

    #[test]
    fn with_all_of_nothing_just_runs() {
        let locks: KeyedLocks<u8> = KeyedLocks::new();
        assert_eq!(locks.with_all(&[], || 5), 5);
    }

    #[test]
    fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        // Nested acquisition of a different key would deadlock if keys
        // shared a mutex.
        let v = locks.with(&1, || locks.with(&2, || 3));
        assert_eq!(v, 3);
    }
}
