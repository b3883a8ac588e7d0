//! Set-associative cache metadata with LRU replacement. Only line addresses
//! are tracked, no data bytes: the flat memory is the single store and the
//! cache exists to decide hit/miss latency.

use crate::counters::{CacheCounters, Cycle};

#[derive(Debug, Default, Clone, Copy)]
struct Entry {
    valid: bool,
    line: u32,
    touched: Cycle,
}

pub struct Cache {
    sets: Vec<Vec<Entry>>,
    nsets: u32,
    nways: u32,
    linesize: u32,
    pub counters: CacheCounters,
}

impl Cache {
    pub fn new(nsets: u32, nways: u32, linesize: u32) -> Self {
        assert!(
            nsets > 0 && nways > 0 && linesize > 0,
            "degenerate cache geometry: {nsets} sets x {nways} ways x {linesize} bytes"
        );
        Self {
            sets: vec![vec![Entry::default(); nways as usize]; nsets as usize],
            nsets,
            nways,
            linesize,
            counters: CacheCounters::default(),
        }
    }

    pub fn nsets(&self) -> u32 {
        self.nsets
    }

    pub fn nways(&self) -> u32 {
        self.nways
    }

    pub fn linesize(&self) -> u32 {
        self.linesize
    }

    pub fn capacity(&self) -> u32 {
        self.nsets * self.nways * self.linesize
    }

    /// Look up the line holding byte address `addr` at cycle `now`.
    ///
    /// A hit refreshes the entry's recency stamp. A miss installs the line,
    /// filling an invalid way if one exists and otherwise evicting the way
    /// with the oldest stamp. Returns whether the access hit.
    pub fn lookup(&mut self, addr: u32, now: Cycle) -> bool {
        self.counters.accesses += 1;
        let line = addr / self.linesize;
        let setix = (line % self.nsets) as usize;
        let set = &mut self.sets[setix];
        if let Some(way) = set.iter_mut().find(|w| w.valid && w.line == line) {
            self.counters.hits += 1;
            way.touched = now;
            return true;
        }
        self.counters.misses += 1;
        let mut lasttouch = now;
        let mut lru = None;
        for (wayix, way) in set.iter().enumerate() {
            if !way.valid {
                lru = Some(wayix);
                break;
            }
            // `<=` keeps the last way scanned among equal stamps
            if way.touched <= lasttouch {
                lru = Some(wayix);
                lasttouch = way.touched;
            }
        }
        let Some(lru) = lru else {
            // stamps are drawn from the same monotonic clock as `now`, so a
            // fully valid set always yields a candidate
            unreachable!("no eviction candidate in set {setix}");
        };
        set[lru] = Entry {
            valid: true,
            line,
            touched: now,
        };
        false
    }

    /// Invalidate every entry. Counters are left untouched; they belong to
    /// the run, not to the cache contents.
    pub fn clear(&mut self) {
        for set in &mut self.sets {
            for way in set.iter_mut() {
                *way = Entry::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l1() -> Cache {
        Cache::new(16, 4, 8)
    }

    #[test]
    fn capacity_is_product_of_geometry() {
        let c = l1();
        assert_eq!(c.nsets(), 16);
        assert_eq!(c.nways(), 4);
        assert_eq!(c.linesize(), 8);
        assert_eq!(c.capacity(), 16 * 4 * 8);
        let c = Cache::new(64, 8, 32);
        assert_eq!(c.capacity(), 64 * 8 * 32);
    }

    #[test]
    fn accesses_balance_at_every_step() {
        let mut c = l1();
        for (now, addr) in [0u32, 0, 128, 8, 0, 512, 128].iter().enumerate() {
            c.lookup(*addr, now as Cycle);
            let ctr = c.counters;
            assert_eq!(ctr.accesses, now as u64 + 1);
            assert_eq!(ctr.accesses, ctr.hits + ctr.misses);
        }
    }

    #[test]
    fn miss_then_hit_on_same_address() {
        let mut c = l1();
        assert!(!c.lookup(0, 1));
        assert!(c.lookup(0, 2));
        // any address within the same 8-byte line hits too
        assert!(c.lookup(7, 3));
        assert_eq!(c.counters.misses, 1);
        assert_eq!(c.counters.hits, 2);
    }

    #[test]
    fn invalid_ways_fill_before_any_eviction() {
        let mut c = l1();
        // four lines mapping to set 0: 0, 128, 256, 384 (line % 16 == 0)
        for (now, addr) in [0u32, 128, 256, 384].iter().enumerate() {
            assert!(!c.lookup(*addr, now as Cycle + 1));
        }
        // all four still resident: filling never evicted a valid entry
        for (now, addr) in [0u32, 128, 256, 384].iter().enumerate() {
            assert!(c.lookup(*addr, now as Cycle + 5));
        }
    }

    #[test]
    fn fifth_conflicting_line_evicts_least_recently_touched() {
        let mut c = l1();
        for (now, addr) in [0u32, 128, 256, 384].iter().enumerate() {
            assert!(!c.lookup(*addr, now as Cycle + 1));
        }
        // 512 maps to set 0 as well and must displace line 0, the oldest
        assert!(!c.lookup(512, 5));
        assert!(!c.lookup(0, 6));
        // 384 was more recently filled than line 0 and must have survived
        assert!(c.lookup(384, 7));
    }

    #[test]
    fn rehit_consumes_no_extra_way() {
        let mut c = l1();
        c.lookup(0, 1);
        c.lookup(0, 2);
        c.lookup(0, 3);
        // three more distinct lines still fit alongside line 0
        assert!(!c.lookup(128, 4));
        assert!(!c.lookup(256, 5));
        assert!(!c.lookup(384, 6));
        assert!(c.lookup(0, 7));
    }

    #[test]
    fn equal_stamps_break_toward_highest_way() {
        let mut c = l1();
        for addr in [0u32, 128, 256, 384] {
            c.lookup(addr, 3);
        }
        // every stamp equals 3: the scan keeps the last `<=` match, so the
        // newest-filled way (line 48, byte 384) is the victim
        assert!(!c.lookup(512, 3));
        assert!(!c.lookup(384, 4));
        assert!(c.lookup(0, 5));
        assert!(c.lookup(128, 6));
        assert!(c.lookup(256, 7));
    }

    #[test]
    fn clear_forgets_contents_but_not_counters() {
        let mut c = l1();
        c.lookup(0, 1);
        c.lookup(0, 2);
        c.clear();
        assert!(!c.lookup(0, 3));
        assert_eq!(c.counters.accesses, 3);
        assert_eq!(c.counters.misses, 2);
    }

    #[test]
    #[should_panic(expected = "degenerate cache geometry")]
    fn zero_ways_is_rejected() {
        let _ = Cache::new(16, 0, 8);
    }
}
