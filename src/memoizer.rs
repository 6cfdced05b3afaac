use crate::compute::{Compute, Recursive};
use crate::stats::CacheStats;
use crate::store::Store;
use itertools::Itertools;
use log::{debug, trace};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

const DEFAULT_LABEL: &str = "memo";

/// Wraps a callable `F` and caches its result for every argument tuple
/// `Args` it has been invoked with.
///
/// The cache is owned by the memoizer but open to the caller, who may
/// seed, patch or drop entries at any time. Invocation only takes `&self`
/// and no borrow of the cache is held while `F` runs, so `F` may call back
/// into the same memoizer (see [`Memoizer::recursive`]).
///
/// Not thread-safe; see [`crate::sync::SyncMemoizer`] for that.
pub struct Memoizer<Args, V, F, S = HashMap<Args, V>> {
    cache: RefCell<S>,
    compute: F,
    label: String,
    hits: Cell<u64>,
    misses: Cell<u64>,
    _types: PhantomData<fn(Args) -> V>,
}

impl<Args, V, F> Memoizer<Args, V, F> {
    pub fn new(compute: F) -> Self {
        Self::with_store(compute, HashMap::new())
    }

    pub fn with_capacity(compute: F, capacity: usize) -> Self {
        Self::with_store(compute, HashMap::with_capacity(capacity))
    }
}

impl<Args, V, G> Memoizer<Args, V, Recursive<G>> {
    /// Memoizes a body that receives the memoizer's own entry point as
    /// its first argument, e.g. for memoized recursion.
    ///
    /// A cycle on the same key recurses forever unless the body has a base
    /// case or the key is seeded in the cache beforehand.
    pub fn recursive<O>(body: G) -> Self
    where
        G: Fn(&dyn Fn(Args) -> O, Args) -> O,
    {
        Self::new(Recursive::new(body))
    }
}

impl<Args, V, F, S> Memoizer<Args, V, F, S> {
    /// Memoizes `compute` into `store`, which may already hold entries.
    pub fn with_store(compute: F, store: S) -> Self {
        Memoizer {
            cache: RefCell::new(store),
            compute,
            label: DEFAULT_LABEL.to_string(),
            hits: Cell::new(0),
            misses: Cell::new(0),
            _types: PhantomData,
        }
    }

    /// Sets the name this memoizer logs under.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrows the store.
    ///
    /// Panics if the memoizer is invoked while the borrow is alive and the
    /// invocation has to write a result.
    pub fn cache(&self) -> Ref<'_, S> {
        self.cache.borrow()
    }

    /// Mutably borrows the store.
    ///
    /// Panics if the memoizer is invoked while the borrow is alive.
    pub fn cache_mut(&self) -> RefMut<'_, S> {
        self.cache.borrow_mut()
    }

    pub fn into_cache(self) -> S {
        self.cache.into_inner()
    }
}

impl<Args, V, F, S> Memoizer<Args, V, F, S>
where
    Args: Clone,
    V: Clone,
    S: Store<Args, V>,
{
    /// Returns the cached result for `args`, computing and caching it on a
    /// miss.
    pub fn invoke(&self, args: Args) -> V
    where
        F: Compute<Args, V>,
    {
        if let Some(value) = self.lookup(&args) {
            return value;
        }
        let value = self
            .compute
            .compute(&|args| self.invoke(args), args.clone());
        self.store(args, value.clone());
        value
    }

    /// Like [`Memoizer::invoke`] for fallible callables.
    ///
    /// Only `Ok` results are cached: an `Err` is returned unchanged and the
    /// next invocation with the same arguments computes again.
    pub fn try_invoke<E>(&self, args: Args) -> Result<V, E>
    where
        F: Compute<Args, Result<V, E>>,
    {
        if let Some(value) = self.lookup(&args) {
            return Ok(value);
        }
        match self
            .compute
            .compute(&|args| self.try_invoke(args), args.clone())
        {
            Ok(value) => {
                self.store(args, value.clone());
                Ok(value)
            }
            Err(e) => {
                debug!("{}: computation failed, result not cached", self.label);
                Err(e)
            }
        }
    }

    fn lookup(&self, args: &Args) -> Option<V> {
        let cached = self.cache.borrow().get(args).cloned();
        match cached {
            Some(_) => {
                self.hits.set(self.hits.get() + 1);
                trace!("{}: hit", self.label);
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                debug!("{}: miss, computing", self.label);
            }
        }
        cached
    }

    // A reentrant call may have filled the key meanwhile; the fresh result wins.
    fn store(&self, args: Args, value: V) {
        let mut cache = self.cache.borrow_mut();
        if cache.insert(args, value).is_some() {
            trace!("{}: overwrote an entry filled during computation", self.label);
        }
    }

    pub fn get(&self, args: &Args) -> Option<V> {
        self.cache.borrow().get(args).cloned()
    }

    /// Sets the cached result for `args`, returning the previous one.
    pub fn insert(&self, args: Args, value: V) -> Option<V> {
        self.cache.borrow_mut().insert(args, value)
    }

    /// Drops the cached result for `args`, so that the next invocation
    /// recomputes it.
    pub fn remove(&self, args: &Args) -> Option<V> {
        self.cache.borrow_mut().remove(args)
    }

    pub fn contains(&self, args: &Args) -> bool {
        self.cache.borrow().contains_key(args)
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear()
    }

    /// Snapshot of the cached entries, in the store's iteration order.
    pub fn entries(&self) -> Vec<(Args, V)> {
        self.cache
            .borrow()
            .entries()
            .map(|(args, value)| (args.clone(), value.clone()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}

impl<Args, V, F> From<F> for Memoizer<Args, V, F> {
    fn from(compute: F) -> Self {
        Memoizer::new(compute)
    }
}

impl<Args, V, F, S> fmt::Display for Memoizer<Args, V, F, S>
where
    Args: fmt::Debug,
    V: fmt::Debug,
    S: Store<Args, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cache = self.cache.borrow();
        if cache.is_empty() {
            write!(f, "{}: empty cache", self.label)
        } else {
            write!(
                f,
                "{}:\n\t{}",
                self.label,
                cache
                    .entries()
                    .map(|(args, value)| format!("{:?} -> {:?}", args, value))
                    .join("\n\t")
            )
        }
    }
}

impl<Args, V, F, S> fmt::Debug for Memoizer<Args, V, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("label", &self.label)
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .finish_non_exhaustive()
    }
}
