//! The simulation context: counters, register files, functional units, the
//! cache hierarchy and memory for one run. Independent machines share
//! nothing.

use serde::Serialize;

use crate::{
    cache::Cache,
    config::{CacheGeometry, MachineConfig},
    counters::{Counters, Cycle},
    memory::Memory,
    op::{Instruction, Op, Result},
    regfile::RegFile,
    units::{UnitKind, Units},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

pub struct Machine {
    pub config: MachineConfig,
    pub counters: Counters,
    pub regs: RegFile,
    pub units: Units,
    pub l1i: Cache,
    pub l1d: Cache,
    pub l2: Cache,
    pub l3: Cache,
    pub mem: Memory,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        let cache = |g: CacheGeometry| Cache::new(g.nsets, g.nways, g.linesize);
        let m = Self {
            counters: Counters::default(),
            regs: RegFile::new(config.gprs, config.fprs),
            units: Units::default(),
            l1i: cache(config.l1i),
            l1d: cache(config.l1d),
            l2: cache(config.l2),
            l3: cache(config.l3),
            mem: Memory::new(config.mem_bytes),
            config,
        };
        for (name, c) in m.caches() {
            log::info!(
                "{name}: {} bytes of capacity, {} sets, {}-way set associative, {}-byte line size",
                c.capacity(),
                c.nsets(),
                c.nways(),
                c.linesize()
            );
        }
        m
    }

    fn caches(&self) -> [(&'static str, &Cache); 4] {
        [
            ("L1I", &self.l1i),
            ("L1D", &self.l1d),
            ("L2", &self.l2),
            ("L3", &self.l3),
        ]
    }

    /// Zero the backing memory. Counters and ready cycles are untouched;
    /// see [`Machine::zeroctrs`] for those.
    pub fn zeromem(&mut self) {
        self.mem.zero();
    }

    /// The canonical start-of-run reset: zero every counter (including the
    /// per-cache ones) and every register/unit ready cycle. Memory contents
    /// and resident cache lines are kept.
    pub fn zeroctrs(&mut self) {
        self.counters.zero();
        self.l1i.counters.zero();
        self.l1d.counters.zero();
        self.l2.counters.zero();
        self.l3.counters.zero();
        self.regs.zero_ready();
        self.units.zero_ready();
    }

    /// Claim the next issue slot for an operation whose sources become
    /// readable at `sources_ready` on the given unit, advancing the clock
    /// and issue counters. Returns the issue cycle.
    pub(crate) fn issue_slot(&mut self, sources_ready: Cycle, unit: UnitKind) -> Cycle {
        let issue = self
            .counters
            .cycles
            .max(sources_ready)
            .max(self.units.get(unit).ready)
            .max(self.counters.lastissued + 1);
        self.counters.cycles = issue;
        self.counters.lastissued = issue;
        self.counters.operations += 1;
        issue
    }

    /// Walk the data side of the hierarchy for `ea` and return the access
    /// latency of the first level that hits (memory if none does). Every
    /// level walked installs the line on its miss.
    pub(crate) fn data_access(&mut self, ea: u32) -> Cycle {
        let now = self.counters.cycles;
        let lat = self.config.latencies;
        if self.l1d.lookup(ea, now) {
            lat.l1
        } else if self.l2.lookup(ea, now) {
            lat.l2
        } else if self.l3.lookup(ea, now) {
            lat.l3
        } else {
            lat.mem
        }
    }

    /// Same walk on the instruction side: L1I in front of the shared L2/L3.
    pub(crate) fn instr_access(&mut self, pc: u32) -> Cycle {
        let now = self.counters.cycles;
        let lat = self.config.latencies;
        if self.l1i.lookup(pc, now) {
            lat.l1
        } else if self.l2.lookup(pc, now) {
            lat.l2
        } else if self.l3.lookup(pc, now) {
            lat.l3
        } else {
            lat.mem
        }
    }

    /// Process a single operation. See [`crate::op::process`].
    pub fn process(&mut self, op: &Op) -> Result<bool> {
        op.process(self)
    }

    /// Issue one instruction: charge its fetch (when an address is present),
    /// then process its operations in program order. A fetch that misses in
    /// the L1I delays the earliest issue slot by the extra latency.
    pub fn issue(&mut self, inst: &Instruction) -> Result<()> {
        self.counters.instructions += 1;
        if let Some(pc) = inst.pc {
            let latency = self.instr_access(pc);
            // an L1I hit is hidden by the fetch stage; only the extra
            // latency of a deeper walk stalls issue
            self.counters.cycles += latency.saturating_sub(self.config.latencies.l1);
        }
        for op in &inst.ops {
            op.process(self)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            counters: self.counters,
            caches: self
                .caches()
                .into_iter()
                .map(|(name, c)| CacheSnapshot {
                    name,
                    nsets: c.nsets(),
                    nways: c.nways(),
                    linesize: c.linesize(),
                    capacity: c.capacity(),
                    accesses: c.counters.accesses,
                    hits: c.counters.hits,
                    misses: c.counters.misses,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub name: &'static str,
    pub nsets: u32,
    pub nways: u32,
    pub linesize: u32,
    pub capacity: u32,
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineSnapshot {
    pub counters: Counters,
    pub caches: Vec<CacheSnapshot>,
}

#[cfg(feature = "stat")]
impl Machine {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Machine {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(stat::CounterStat::new(self.counters)));
        for (name, c) in self.caches() {
            buf.push(Box::new(stat::CacheStat::new(name, c)));
        }
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::*;
    use crate::counters::CacheCounters;
    use crate::stat::Stat;

    pub struct CounterStat {
        c: Counters,
    }

    impl CounterStat {
        pub fn new(c: Counters) -> Self {
            Self { c }
        }
    }

    impl Stat for CounterStat {
        fn header(&self) -> &'static str {
            "issue counters"
        }
    }

    impl fmt::Display for CounterStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "        cycles: {:>12}", self.c.cycles)?;
            writeln!(f, "  instructions: {:>12}", self.c.instructions)?;
            writeln!(f, "    operations: {:>12}", self.c.operations)?;
            writeln!(f, "    last issue: {:>12}", self.c.lastissued)
        }
    }

    pub struct CacheStat {
        name: &'static str,
        geometry: String,
        c: CacheCounters,
    }

    impl CacheStat {
        pub fn new(name: &'static str, cache: &Cache) -> Self {
            Self {
                name,
                geometry: format!(
                    "{} B, {} sets x {} ways x {} B lines",
                    cache.capacity(),
                    cache.nsets(),
                    cache.nways(),
                    cache.linesize()
                ),
                c: cache.counters,
            }
        }
    }

    impl Stat for CacheStat {
        fn header(&self) -> &'static str {
            "cache stat"
        }
    }

    impl fmt::Display for CacheStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let CacheCounters {
                accesses,
                hits,
                misses,
            } = self.c;
            let pct = |n: u64| {
                if accesses == 0 {
                    0.0
                } else {
                    100. * n as f64 / accesses as f64
                }
            };
            writeln!(f, "  {:>4}: {}", self.name, self.geometry)?;
            writeln!(f, "      accesses: {accesses:>10}")?;
            writeln!(f, "          hits: {hits:>10} ({:>8.4}%)", pct(hits))?;
            writeln!(f, "        misses: {misses:>10} ({:>8.4}%)", pct(misses))
        }
    }
}
