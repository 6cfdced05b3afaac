use std::fmt;

/// Counters of a memoizer.
///
/// `misses` counts computations started, failed ones included. `hits`
/// counts invocations served without running the callable. Direct cache
/// accessors are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses ({:.1}% hit rate)",
            self.size,
            self.hits,
            self.misses,
            100.0 * self.hit_rate()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        let stats = CacheStats {
            size: 2,
            hits: 3,
            misses: 1,
        };
        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(
            stats.to_string(),
            "2 entries, 3 hits, 1 misses (75.0% hit rate)"
        );
    }
}
