//! Issue and cache accounting for one timed run.

use serde::Serialize;

/// Simulated time. A single monotonic clock drives both pipeline timing and
/// cache recency stamps.
pub type Cycle = u64;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Counters {
    /// Issue-time clock: advanced to each operation's issue cycle.
    pub cycles: Cycle,
    pub instructions: u64,
    pub operations: u64,
    /// Cycle of the most recent issue; the next issue slot is strictly later.
    pub lastissued: Cycle,
}

impl Counters {
    pub fn zero(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CacheCounters {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheCounters {
    pub fn zero(&mut self) {
        *self = Self::default();
    }
    pub fn record(&mut self, hit: bool) {
        self.accesses += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}
