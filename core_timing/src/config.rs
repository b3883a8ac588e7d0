//! Machine parameters. Defaults reproduce the instructional model this
//! simulator is calibrated against: a 64 KiB memory, 16 integer and 8 float
//! registers, and a small four-way L1 in front of two larger shared levels.

use crate::counters::Cycle;

#[derive(Debug, Clone, Copy)]
pub struct CacheGeometry {
    pub nsets: u32,
    pub nways: u32,
    pub linesize: u32,
}

impl CacheGeometry {
    pub fn capacity(&self) -> u32 {
        self.nsets * self.nways * self.linesize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Latencies {
    /// Load/store latency when the access hits at the given level.
    pub l1: Cycle,
    pub l2: Cycle,
    pub l3: Cycle,
    pub mem: Cycle,
    pub fx: Cycle,
    pub fp: Cycle,
    pub branch: Cycle,
}

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub mem_bytes: usize,
    pub gprs: usize,
    pub fprs: usize,
    pub l1i: CacheGeometry,
    pub l1d: CacheGeometry,
    pub l2: CacheGeometry,
    pub l3: CacheGeometry,
    pub latencies: Latencies,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            mem_bytes: 65536,
            gprs: 16,
            fprs: 8,
            l1i: CacheGeometry {
                nsets: 16,
                nways: 4,
                linesize: 8,
            },
            l1d: CacheGeometry {
                nsets: 16,
                nways: 4,
                linesize: 8,
            },
            l2: CacheGeometry {
                nsets: 64,
                nways: 8,
                linesize: 32,
            },
            l3: CacheGeometry {
                nsets: 256,
                nways: 8,
                linesize: 64,
            },
            latencies: Latencies {
                l1: 2,
                l2: 10,
                l3: 40,
                mem: 300,
                fx: 1,
                fp: 6,
                branch: 1,
            },
        }
    }
}
