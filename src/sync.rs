//! Memoization shared between threads.
//!
//! Each key owns a [`OnceCell`]: concurrent invocations with the same
//! uncached arguments run the callable once, the others block on the cell
//! and receive its value. The map lock is only held to find or create a
//! cell, never while the callable runs.

use crate::compute::{Compute, Recursive};
use crate::stats::CacheStats;
use log::{debug, trace};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_LABEL: &str = "sync-memo";

type Slot<V> = Arc<OnceCell<V>>;

// Holds a key's cell for the duration of one invocation. If the cell is
// still empty when the last holder lets go, it is removed from the map.
struct Claim<'a, Args: Eq + Hash, V> {
    cells: &'a RwLock<HashMap<Args, Slot<V>>>,
    args: &'a Args,
    slot: Slot<V>,
}

impl<Args: Eq + Hash, V> Drop for Claim<'_, Args, V> {
    fn drop(&mut self) {
        if self.slot.get().is_some() {
            return;
        }
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        // release our handle under the lock so the last holder sees a count of one
        let slot = std::mem::take(&mut self.slot);
        let ours = cells
            .get(self.args)
            .is_some_and(|cell| Arc::ptr_eq(cell, &slot));
        drop(slot);
        let abandoned = ours
            && cells
                .get(self.args)
                .is_some_and(|cell| Arc::strong_count(cell) == 1 && cell.get().is_none());
        if abandoned {
            cells.remove(self.args);
        }
    }
}

/// A memoizer that may be invoked from several threads at once, with at
/// most one computation per key.
///
/// A key whose computation failed or panicked is left uncached: its cell is
/// dropped from the map once no other caller is waiting on it, and the next
/// invocation retries.
/// A direct [`insert`](SyncMemoizer::insert) or
/// [`remove`](SyncMemoizer::remove) detaches any computation in flight
/// for that key: the direct write stands.
///
/// Unlike [`crate::Memoizer`], a computation that invokes its own key again
/// blocks forever.
pub struct SyncMemoizer<Args, V, F> {
    cells: RwLock<HashMap<Args, Slot<V>>>,
    compute: F,
    label: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<Args, V, F> SyncMemoizer<Args, V, F> {
    pub fn new(compute: F) -> Self {
        Self::with_capacity(compute, 0)
    }

    pub fn with_capacity(compute: F, capacity: usize) -> Self {
        SyncMemoizer {
            cells: RwLock::new(HashMap::with_capacity(capacity)),
            compute,
            label: DEFAULT_LABEL.to_string(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    // The map is never left half-updated, a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Args, Slot<V>>> {
        self.cells.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Args, Slot<V>>> {
        self.cells.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Args, V, G> SyncMemoizer<Args, V, Recursive<G>> {
    /// See [`crate::Memoizer::recursive`].
    pub fn recursive<O>(body: G) -> Self
    where
        G: Fn(&dyn Fn(Args) -> O, Args) -> O,
    {
        Self::new(Recursive::new(body))
    }
}

impl<Args, V, F> SyncMemoizer<Args, V, F>
where
    Args: Eq + Hash + Clone,
    V: Clone,
{
    pub fn invoke(&self, args: Args) -> V
    where
        F: Compute<Args, V>,
    {
        let claim = self.claim(&args);
        let mut computed = false;
        let value = claim
            .slot
            .get_or_init(|| {
                computed = true;
                self.record_miss();
                self.compute.compute(&|args| self.invoke(args), args.clone())
            })
            .clone();
        if !computed {
            self.record_hit();
        }
        value
    }

    /// Like [`SyncMemoizer::invoke`] for fallible callables. An `Err` is
    /// returned unchanged and leaves the key uncached.
    pub fn try_invoke<E>(&self, args: Args) -> Result<V, E>
    where
        F: Compute<Args, Result<V, E>>,
    {
        let claim = self.claim(&args);
        let mut computed = false;
        let outcome = claim.slot.get_or_try_init(|| {
            computed = true;
            self.record_miss();
            self.compute.compute(&|args| self.try_invoke(args), args.clone())
        });
        if !computed {
            self.record_hit();
        }
        match outcome {
            Ok(value) => Ok(value.clone()),
            Err(e) => {
                debug!("{}: computation failed, result not cached", self.label);
                Err(e)
            }
        }
    }

    /// Invokes every argument tuple of `batch` on the rayon pool. Results
    /// come back in the order of `batch`.
    pub fn invoke_batch(&self, batch: Vec<Args>) -> Vec<V>
    where
        F: Compute<Args, V> + Sync,
        Args: Send + Sync,
        V: Send + Sync,
    {
        debug!("{}: invoking a batch of {}", self.label, batch.len());
        batch
            .into_par_iter()
            .map(|args| self.invoke(args))
            .collect()
    }

    fn claim<'a>(&'a self, args: &'a Args) -> Claim<'a, Args, V> {
        let existing = self.read().get(args).map(Arc::clone);
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.write().entry(args.clone()).or_default()),
        };
        Claim {
            cells: &self.cells,
            args,
            slot,
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("{}: miss, computing", self.label);
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!("{}: hit", self.label);
    }

    pub fn get(&self, args: &Args) -> Option<V> {
        self.read().get(args).and_then(|slot| slot.get().cloned())
    }

    /// Sets the cached result for `args`, returning the previous one.
    pub fn insert(&self, args: Args, value: V) -> Option<V> {
        self.write()
            .insert(args, Arc::new(OnceCell::with_value(value)))
            .and_then(|slot| slot.get().cloned())
    }

    pub fn remove(&self, args: &Args) -> Option<V> {
        self.write()
            .remove(args)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, args: &Args) -> bool {
        self.read().get(args).is_some_and(|slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().clear()
    }

    pub fn entries(&self) -> Vec<(Args, V)> {
        self.read()
            .iter()
            .filter_map(|(args, slot)| slot.get().map(|value| (args.clone(), value.clone())))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<Args, V, F> From<F> for SyncMemoizer<Args, V, F> {
    fn from(compute: F) -> Self {
        SyncMemoizer::new(compute)
    }
}

impl<Args, V, F> fmt::Debug for SyncMemoizer<Args, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SyncMemoizer")
            .field("label", &self.label)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
