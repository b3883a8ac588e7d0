use std::fmt::Display;

use crate::counters::Cycle;

/// One architectural register: its value and the earliest cycle at which a
/// consumer may read that value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reg<T> {
    pub data: T,
    pub ready: Cycle,
}

/// Fixed-size integer and floating-point register files.
pub struct RegFile {
    gpr: Vec<Reg<u32>>,
    fpr: Vec<Reg<f64>>,
}

impl RegFile {
    pub fn new(gprs: usize, fprs: usize) -> Self {
        Self {
            gpr: vec![Reg::default(); gprs],
            fpr: vec![Reg::default(); fprs],
        }
    }

    pub fn gpr(&self, ix: usize) -> &Reg<u32> {
        &self.gpr[ix]
    }

    pub fn gpr_mut(&mut self, ix: usize) -> &mut Reg<u32> {
        &mut self.gpr[ix]
    }

    pub fn fpr(&self, ix: usize) -> &Reg<f64> {
        &self.fpr[ix]
    }

    pub fn fpr_mut(&mut self, ix: usize) -> &mut Reg<f64> {
        &mut self.fpr[ix]
    }

    pub fn num_gprs(&self) -> usize {
        self.gpr.len()
    }

    pub fn num_fprs(&self) -> usize {
        self.fpr.len()
    }

    /// Make every register immediately readable. Data values are kept.
    pub fn zero_ready(&mut self) {
        for r in &mut self.gpr {
            r.ready = 0;
        }
        for r in &mut self.fpr {
            r.ready = 0;
        }
    }

    pub fn view(&self, chunk_size: usize) -> RegFileView<'_> {
        RegFileView {
            r: self,
            chunk_size: chunk_size.max(1),
        }
    }
}

pub struct RegFileView<'a> {
    r: &'a RegFile,
    chunk_size: usize,
}

impl Display for RegFileView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn fmt_inner(
            map: Vec<String>,
            chunk_size: usize,
            f: &mut std::fmt::Formatter,
        ) -> std::fmt::Result {
            for chunk in map.chunks(chunk_size) {
                let s = chunk.join(", ");
                writeln!(f, "  {s},")?;
            }
            Ok(())
        }
        writeln!(f, "RegFile (format: `value @ready-cycle`) {{")?;
        let map: Vec<_> = self
            .r
            .gpr
            .iter()
            .enumerate()
            .map(|(i, r)| format!("r{i:<2}: {:>10} @{:>8}", r.data, r.ready))
            .collect();
        fmt_inner(map, self.chunk_size, f)?;
        let map: Vec<_> = self
            .r
            .fpr
            .iter()
            .enumerate()
            .map(|(i, r)| format!("f{i:<2}: {:>10.3} @{:>8}", r.data, r.ready))
            .collect();
        fmt_inner(map, self.chunk_size, f)?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ready_keeps_data() {
        let mut rf = RegFile::new(16, 8);
        rf.gpr_mut(3).data = 77;
        rf.gpr_mut(3).ready = 120;
        rf.fpr_mut(1).data = 2.5;
        rf.fpr_mut(1).ready = 64;
        rf.zero_ready();
        assert_eq!(rf.gpr(3).data, 77);
        assert_eq!(rf.gpr(3).ready, 0);
        assert_eq!(rf.fpr(1).data, 2.5);
        assert_eq!(rf.fpr(1).ready, 0);
    }

    #[test]
    fn view_renders_every_register() {
        let rf = RegFile::new(4, 2);
        let s = rf.view(2).to_string();
        assert!(s.contains("r0 "));
        assert!(s.contains("r3 "));
        assert!(s.contains("f1 "));
    }
}
