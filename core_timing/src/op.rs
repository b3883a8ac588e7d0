//! Operations and the scoreboard issue logic. Processing an operation
//! computes its issue cycle from register and unit ready cycles, charges the
//! memory hierarchy where needed, applies the data effect and writes the new
//! ready cycles back. Program order is the issue order.

use thiserror::Error;

use crate::{
    machine::Machine,
    memory::MemoryAccessError,
    units::UnitKind,
};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    MemoryAccessError(#[from] MemoryAccessError),
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

/// A register in either file. Loads into a [`Dest::Fpr`] widen the stored
/// f32 to f64; stores from one narrow it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dest {
    Gpr(usize),
    Fpr(usize),
}

#[derive(Debug, Clone, Copy)]
pub enum FxOp {
    Add { rt: usize, ra: usize, rb: usize },
    Addi { rt: usize, ra: usize, imm: i32 },
}

#[derive(Debug, Clone, Copy)]
pub enum FpOp {
    Fadd { rt: usize, ra: usize, rb: usize },
    Fsub { rt: usize, ra: usize, rb: usize },
    Fmul { rt: usize, ra: usize, rb: usize },
    /// rt = ra * rb + rc
    Fmadd { rt: usize, ra: usize, rb: usize, rc: usize },
}

#[derive(Debug, Clone, Copy)]
pub enum Op {
    Load { dst: Dest, ra: usize, disp: u32 },
    Store { src: Dest, ra: usize, disp: u32 },
    Fx(FxOp),
    Fp(FpOp),
    /// Decrement-and-branch-on-count: decrements `gpr[ctr]`; the branch is
    /// taken while the count stays nonzero. Fetch redirect is not modeled,
    /// so the issuing driver reads the count register to steer itself.
    Bc { ctr: usize },
}

impl Op {
    pub fn unit(&self) -> UnitKind {
        match self {
            Op::Load { .. } => UnitKind::Ldu,
            Op::Store { .. } => UnitKind::Stu,
            Op::Fx(_) => UnitKind::Fxu,
            Op::Fp(_) => UnitKind::Fpu,
            Op::Bc { .. } => UnitKind::Bru,
        }
    }

    pub(crate) fn process(&self, m: &mut Machine) -> Result<bool> {
        match *self {
            Op::Load { dst, ra, disp } => {
                let base = *m.regs.gpr(ra);
                let ea = base.data.wrapping_add(disp);
                let issue = m.issue_slot(base.ready, UnitKind::Ldu);
                let latency = m.data_access(ea);
                m.units.ldu.ready = issue + latency;
                match dst {
                    Dest::Gpr(rt) => {
                        let val = m.mem.read_u32(ea as usize)?;
                        let r = m.regs.gpr_mut(rt);
                        r.data = val;
                        r.ready = issue + latency;
                    }
                    Dest::Fpr(ft) => {
                        let val = f64::from(m.mem.read_f32(ea as usize)?);
                        let r = m.regs.fpr_mut(ft);
                        r.data = val;
                        r.ready = issue + latency;
                    }
                }
                log::trace!("{self:?} issued at {issue} (latency {latency})");
                Ok(true)
            }
            Op::Store { src, ra, disp } => {
                let base = *m.regs.gpr(ra);
                let ea = base.data.wrapping_add(disp);
                let src_ready = match src {
                    Dest::Gpr(rs) => m.regs.gpr(rs).ready,
                    Dest::Fpr(fs) => m.regs.fpr(fs).ready,
                };
                let issue = m.issue_slot(base.ready.max(src_ready), UnitKind::Stu);
                let latency = m.data_access(ea);
                m.units.stu.ready = issue + latency;
                match src {
                    Dest::Gpr(rs) => {
                        let val = m.regs.gpr(rs).data;
                        m.mem.write_u32(ea as usize, val)?;
                    }
                    Dest::Fpr(fs) => {
                        let val = m.regs.fpr(fs).data as f32;
                        m.mem.write_f32(ea as usize, val)?;
                    }
                }
                log::trace!("{self:?} issued at {issue} (latency {latency})");
                Ok(true)
            }
            Op::Fx(fx) => {
                let (rt, sources, val) = match fx {
                    FxOp::Add { rt, ra, rb } => {
                        let a = *m.regs.gpr(ra);
                        let b = *m.regs.gpr(rb);
                        (rt, a.ready.max(b.ready), a.data.wrapping_add(b.data))
                    }
                    FxOp::Addi { rt, ra, imm } => {
                        let a = *m.regs.gpr(ra);
                        (rt, a.ready, a.data.wrapping_add_signed(imm))
                    }
                };
                let issue = m.issue_slot(sources, UnitKind::Fxu);
                let latency = m.config.latencies.fx;
                m.units.fxu.ready = issue + latency;
                let r = m.regs.gpr_mut(rt);
                r.data = val;
                r.ready = issue + latency;
                log::trace!("{self:?} issued at {issue}");
                Ok(true)
            }
            Op::Fp(fp) => {
                let (rt, sources, val) = match fp {
                    FpOp::Fadd { rt, ra, rb } => {
                        let a = *m.regs.fpr(ra);
                        let b = *m.regs.fpr(rb);
                        (rt, a.ready.max(b.ready), a.data + b.data)
                    }
                    FpOp::Fsub { rt, ra, rb } => {
                        let a = *m.regs.fpr(ra);
                        let b = *m.regs.fpr(rb);
                        (rt, a.ready.max(b.ready), a.data - b.data)
                    }
                    FpOp::Fmul { rt, ra, rb } => {
                        let a = *m.regs.fpr(ra);
                        let b = *m.regs.fpr(rb);
                        (rt, a.ready.max(b.ready), a.data * b.data)
                    }
                    FpOp::Fmadd { rt, ra, rb, rc } => {
                        let a = *m.regs.fpr(ra);
                        let b = *m.regs.fpr(rb);
                        let c = *m.regs.fpr(rc);
                        let ready = a.ready.max(b.ready).max(c.ready);
                        (rt, ready, a.data * b.data + c.data)
                    }
                };
                let issue = m.issue_slot(sources, UnitKind::Fpu);
                let latency = m.config.latencies.fp;
                m.units.fpu.ready = issue + latency;
                let r = m.regs.fpr_mut(rt);
                r.data = val;
                r.ready = issue + latency;
                log::trace!("{self:?} issued at {issue}");
                Ok(true)
            }
            Op::Bc { ctr } => {
                let c = *m.regs.gpr(ctr);
                let issue = m.issue_slot(c.ready, UnitKind::Bru);
                let latency = m.config.latencies.branch;
                m.units.bru.ready = issue + latency;
                let r = m.regs.gpr_mut(ctr);
                r.data = c.data.wrapping_sub(1);
                r.ready = issue + latency;
                log::trace!("{self:?} issued at {issue} (count now {})", r.data);
                Ok(true)
            }
        }
    }
}

/// Uniform dispatch over every operation variant. The bool is the completion
/// signal: a variant may model multi-cycle work by returning false until a
/// later call completes it; all current variants complete in one call.
pub fn process(m: &mut Machine, op: &Op) -> Result<bool> {
    op.process(m)
}

/// One architected instruction: a fetch address and the operations it cracks
/// into. The address is optional since instruction fetch is only accounted,
/// never decoded.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub pc: Option<u32>,
    pub ops: Vec<Op>,
}

impl Instruction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { pc: None, ops }
    }

    pub fn at(pc: u32, ops: Vec<Op>) -> Self {
        Self { pc: Some(pc), ops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MachineConfig, machine::Machine};

    fn machine() -> Machine {
        Machine::new(MachineConfig::default())
    }

    #[test]
    fn single_issue_spaces_independent_ops() {
        let mut m = machine();
        // both operands ready at 0; the issue-slot rule still serializes
        m.process(&Op::Fx(FxOp::Addi { rt: 1, ra: 0, imm: 1 })).unwrap();
        assert_eq!(m.counters.cycles, 1);
        assert_eq!(m.counters.lastissued, 1);
        m.process(&Op::Fx(FxOp::Addi { rt: 2, ra: 0, imm: 2 })).unwrap();
        assert_eq!(m.counters.cycles, 2);
        assert_eq!(m.counters.operations, 2);
        assert_eq!(m.regs.gpr(1).data, 1);
        assert_eq!(m.regs.gpr(2).data, 2);
        // fx latency 1: results usable the cycle after issue
        assert_eq!(m.regs.gpr(2).ready, 3);
    }

    #[test]
    fn data_hazard_delays_dependent_op() {
        let mut m = machine();
        m.regs.fpr_mut(0).data = 1.0;
        m.process(&Op::Fp(FpOp::Fadd { rt: 1, ra: 0, rb: 0 })).unwrap();
        // issues at 1, fp latency 6: f1 ready at 7
        assert_eq!(m.regs.fpr(1).ready, 7);
        m.process(&Op::Fp(FpOp::Fadd { rt: 2, ra: 1, rb: 1 })).unwrap();
        assert_eq!(m.counters.cycles, 7);
        assert_eq!(m.regs.fpr(2).ready, 13);
        assert_eq!(m.regs.fpr(2).data, 4.0);
    }

    #[test]
    fn structural_hazard_holds_the_unit() {
        let mut m = machine();
        m.process(&Op::Fp(FpOp::Fmul { rt: 1, ra: 0, rb: 0 })).unwrap();
        // an independent float op still waits for the FPU
        m.process(&Op::Fp(FpOp::Fmul { rt: 2, ra: 3, rb: 3 })).unwrap();
        assert_eq!(m.counters.cycles, 7);
    }

    #[test]
    fn different_units_overlap() {
        let mut m = machine();
        m.process(&Op::Fp(FpOp::Fmul { rt: 1, ra: 0, rb: 0 })).unwrap();
        // the FXU is free, so only the issue slot spaces this one
        m.process(&Op::Fx(FxOp::Addi { rt: 1, ra: 0, imm: 4 })).unwrap();
        assert_eq!(m.counters.cycles, 2);
    }

    #[test]
    fn load_latency_tracks_the_hierarchy() {
        let mut m = machine();
        let lat = m.config.latencies;
        m.process(&Op::Load { dst: Dest::Fpr(0), ra: 0, disp: 0 }).unwrap();
        // cold caches: every level misses, memory latency applies
        assert_eq!(m.regs.fpr(0).ready, 1 + lat.mem);
        assert_eq!(m.l1d.counters.misses, 1);
        assert_eq!(m.l2.counters.misses, 1);
        assert_eq!(m.l3.counters.misses, 1);
        // the LDU is held, so the rerun issues only once the line landed
        m.process(&Op::Load { dst: Dest::Fpr(1), ra: 0, disp: 0 }).unwrap();
        assert_eq!(m.l1d.counters.hits, 1);
        assert_eq!(m.regs.fpr(1).ready, (1 + lat.mem) + lat.l1);
    }

    #[test]
    fn store_reaches_memory_and_charges_the_cache() {
        let mut m = machine();
        m.regs.gpr_mut(1).data = 0xBEEF;
        m.process(&Op::Store { src: Dest::Gpr(1), ra: 0, disp: 8 }).unwrap();
        assert_eq!(m.mem.read_u32(8).unwrap(), 0xBEEF);
        assert_eq!(m.l1d.counters.accesses, 1);
        assert!(m.units.stu.ready > 0);
    }

    #[test]
    fn float_store_narrows_to_f32() {
        let mut m = machine();
        m.regs.fpr_mut(2).data = 2.5;
        m.process(&Op::Store { src: Dest::Fpr(2), ra: 0, disp: 0 }).unwrap();
        assert_eq!(m.mem.read_f32(0).unwrap(), 2.5);
        m.process(&Op::Load { dst: Dest::Fpr(3), ra: 0, disp: 0 }).unwrap();
        assert_eq!(m.regs.fpr(3).data, 2.5);
    }

    #[test]
    fn bc_counts_down() {
        let mut m = machine();
        m.regs.gpr_mut(8).data = 2;
        m.process(&Op::Bc { ctr: 8 }).unwrap();
        assert_eq!(m.regs.gpr(8).data, 1);
        m.process(&Op::Bc { ctr: 8 }).unwrap();
        assert_eq!(m.regs.gpr(8).data, 0);
        assert_eq!(m.counters.operations, 2);
        assert!(m.units.bru.ready > 0);
    }

    #[test]
    fn out_of_range_address_is_reported() {
        let mut m = machine();
        m.regs.gpr_mut(1).data = m.mem.len() as u32;
        let err = m
            .process(&Op::Load { dst: Dest::Gpr(2), ra: 1, disp: 0 })
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MemoryAccessError(MemoryAccessError::OutOfBounds { .. })
        ));
    }
}
