//! Row-scoped account locks
//!
//! Each account id maps to its own slot. Operations lock every account they
//! touch in ascending id order, so two transfers in opposite directions
//! cannot deadlock. Acquisition gives up after a bounded wait.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::AccountId;

#[derive(Default)]
struct Slot {
    held: Mutex<bool>,
    released: Condvar,
}

impl Slot {
    /// Returns false if the deadline passed while another holder kept it
    fn lock_until(&self, deadline: Instant) -> Result<bool> {
        let mut held = self.held.lock()?;
        while *held {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (guard, _) = self.released.wait_timeout(held, deadline - now)?;
            held = guard;
        }
        *held = true;
        Ok(true)
    }

    fn unlock(&self) {
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

type Registry = Arc<Mutex<HashMap<AccountId, Arc<Slot>>>>;

/// Registry of per-account locks
///
/// A slot lives only while some operation holds or waits for it, so ids that
/// name no account never accumulate.
pub struct AccountLocks {
    slots: Registry,
    timeout: Duration,
}

impl AccountLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Lock the given accounts, waiting until all are held or the timeout
    /// passes. Duplicate ids are locked once. On timeout nothing stays held.
    pub fn acquire(&self, ids: &[AccountId]) -> Result<LockSet> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let slots: Vec<(AccountId, Arc<Slot>)> = {
            let mut registry = self.slots.lock()?;
            ids.iter()
                .map(|id| (*id, Arc::clone(registry.entry(*id).or_default())))
                .collect()
        };

        let deadline = Instant::now() + self.timeout;
        let mut set = LockSet {
            registry: Arc::clone(&self.slots),
            held: Vec::with_capacity(slots.len()),
            waiting: Vec::new(),
        };
        let mut slots = slots.into_iter();
        while let Some((id, slot)) = slots.next() {
            match slot.lock_until(deadline) {
                Ok(true) => set.held.push((id, slot)),
                outcome => {
                    // slots never locked still need pruning when `set` drops
                    set.waiting.push((id, slot));
                    set.waiting.extend(slots.by_ref());
                    return Err(match outcome {
                        Err(e) => e,
                        _ => {
                            debug!(account_id = id, "account lock wait timed out");
                            Error::ConcurrencyConflict(format!(
                                "timed out waiting for account {}",
                                id
                            ))
                        }
                    });
                }
            }
        }
        Ok(set)
    }

    /// Number of accounts with a registered slot
    pub fn tracked(&self) -> Result<usize> {
        Ok(self.slots.lock()?.len())
    }
}

/// Accounts held by one operation, released on drop
pub struct LockSet {
    registry: Registry,
    held: Vec<(AccountId, Arc<Slot>)>,
    /// Slots registered by a failed acquisition but never locked
    waiting: Vec<(AccountId, Arc<Slot>)>,
}

impl LockSet {
    /// Held account ids in acquisition order
    pub fn ids(&self) -> Vec<AccountId> {
        self.held.iter().map(|(id, _)| *id).collect()
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        for (_, slot) in self.held.iter().rev() {
            slot.unlock();
        }

        let mut registry = match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (id, slot) in self.held.iter().chain(self.waiting.iter()) {
            // only the registry and this set still reference the slot
            let idle = Arc::strong_count(slot) == 2
                && registry.get(id).is_some_and(|current| Arc::ptr_eq(current, slot));
            if idle {
                registry.remove(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_acquires_in_ascending_order_without_duplicates() {
        let locks = AccountLocks::new(Duration::from_secs(1));
        let set = locks.acquire(&[9, 3, 9, 5]).unwrap();
        assert_eq!(set.ids(), vec![3, 5, 9]);
    }

    #[test]
    fn test_released_on_drop() {
        let locks = AccountLocks::new(Duration::from_millis(50));
        drop(locks.acquire(&[1, 2]).unwrap());
        assert!(locks.acquire(&[2, 1]).is_ok());
    }

    #[test]
    fn test_times_out_with_conflict() {
        let locks = AccountLocks::new(Duration::from_millis(30));
        let _held = locks.acquire(&[1]).unwrap();

        let err = locks.acquire(&[1, 2]).err().unwrap();
        assert!(matches!(err, Error::ConcurrencyConflict(_)));

        // the partial acquisition of account 2 was rolled back
        assert!(locks.acquire(&[2]).is_ok());
    }

    #[test]
    fn test_disjoint_sets_do_not_block() {
        let locks = AccountLocks::new(Duration::from_millis(30));
        let _a = locks.acquire(&[1, 2]).unwrap();
        assert!(locks.acquire(&[3, 4]).is_ok());
    }

    #[test]
    fn test_idle_slots_are_pruned() {
        let locks = AccountLocks::new(Duration::from_secs(1));
        let set = locks.acquire(&[1, 2]).unwrap();
        assert_eq!(locks.tracked().unwrap(), 2);
        drop(set);
        assert_eq!(locks.tracked().unwrap(), 0);

        for id in 1000..2000 {
            drop(locks.acquire(&[id]).unwrap());
        }
        assert_eq!(locks.tracked().unwrap(), 0);
    }

    #[test]
    fn test_timed_out_acquisition_leaves_only_held_slots() {
        let locks = AccountLocks::new(Duration::from_millis(20));
        let held = locks.acquire(&[1]).unwrap();

        assert!(locks.acquire(&[1, 2, 3]).is_err());
        // 2 and 3 were registered but never locked
        assert_eq!(locks.tracked().unwrap(), 1);

        drop(held);
        assert_eq!(locks.tracked().unwrap(), 0);
    }

    #[test]
    fn test_waiter_keeps_slot_registered() {
        let locks = Arc::new(AccountLocks::new(Duration::from_secs(5)));
        let held = locks.acquire(&[7]).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                let set = locks.acquire(&[7]).unwrap();
                assert_eq!(set.ids(), vec![7]);
            })
        };
        thread::sleep(Duration::from_millis(20));
        drop(held);
        waiter.join().unwrap();
        assert_eq!(locks.tracked().unwrap(), 0);
    }

    #[test]
    fn test_mutual_exclusion_across_threads() {
        let locks = Arc::new(AccountLocks::new(Duration::from_secs(10)));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    // alternate argument order; acquisition order is fixed
                    let ids = if i % 2 == 0 { [1, 2] } else { [2, 1] };
                    let _set = locks.acquire(&ids).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
