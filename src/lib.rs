//! Drop-in memoization for pure functions of any arity from 1 to 16.
//!
//! A [`Memoizer`] wraps a callable and caches its result for each distinct
//! argument tuple. Arguments are passed as a tuple, which is also the
//! cache key:
//!
//! ```
//! use memofn::Memoizer;
//!
//! let square: Memoizer<(u64,), u64, _> = Memoizer::new(|x: u64| x * x);
//! assert_eq!(square.invoke((4,)), 16);
//! assert_eq!(square.invoke((4,)), 16); // served from the cache
//! assert_eq!(square.stats().misses, 1);
//! ```
//!
//! The cache is open: entries can be seeded before the first invocation,
//! patched, or removed to force a recomputation. Fallible callables go
//! through [`Memoizer::try_invoke`], which never caches an `Err`.
//!
//! Memoized recursion:
//!
//! ```
//! use memofn::Memoizer;
//!
//! let fib: Memoizer<(u64,), u64, _> =
//!     Memoizer::recursive(|fib: &dyn Fn((u64,)) -> u64, (n,): (u64,)| {
//!         fib((n - 1,)) + fib((n - 2,))
//!     });
//! fib.insert((0,), 0);
//! fib.insert((1,), 1);
//! assert_eq!(fib.invoke((50,)), 12586269025);
//! ```
//!
//! Purity is the caller's business. Nothing is ever evicted. Use
//! [`SyncMemoizer`] to share a memoized function between threads.

pub mod compute;
pub mod memoizer;
pub mod stats;
pub mod store;
pub mod sync;

pub use compute::{Compute, Recursive};
pub use memoizer::Memoizer;
pub use stats::CacheStats;
pub use store::Store;
pub use sync::SyncMemoizer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_recursion_is_linear() {
        let calls = Cell::new(0);
        let fib: Memoizer<(u32,), u64, _> =
            Memoizer::recursive(|fib: &dyn Fn((u32,)) -> u64, (n,): (u32,)| {
                calls.set(calls.get() + 1);
                fib((n - 1,)) + fib((n - 2,))
            });
        fib.insert((0,), 0);
        fib.insert((1,), 1);
        assert_eq!(fib.invoke((10,)), 55);
        assert_eq!(calls.get(), 9);
        assert_eq!(fib.invoke((90,)), 2880067194370816120);
        assert_eq!(calls.get(), 89);
    }

    #[test]
    fn test_recursion_with_base_case_in_body() {
        let factorial: Memoizer<(u64,), u64, _> =
            Memoizer::recursive(|fact: &dyn Fn((u64,)) -> u64, (n,): (u64,)| {
                if n == 0 {
                    1
                } else {
                    n * fact((n - 1,))
                }
            });
        assert_eq!(factorial.invoke((20,)), 2432902008176640000);
        assert_eq!(factorial.len(), 21);
    }

    #[test]
    fn test_fallible_recursion() {
        let checked: Memoizer<(u32,), u32, _> = Memoizer::recursive(
            |fact: &dyn Fn((u32,)) -> Result<u32, String>, (n,): (u32,)| {
                if n == 0 {
                    return Ok(1);
                }
                let previous = fact((n - 1,))?;
                n.checked_mul(previous)
                    .ok_or_else(|| format!("{}! overflows", n))
            },
        );
        assert_eq!(checked.try_invoke((12,)), Ok(479001600));
        assert_eq!(checked.try_invoke((13,)), Err("13! overflows".to_string()));
        assert!(checked.contains(&(12,)));
        assert!(!checked.contains(&(13,)));
    }
}
