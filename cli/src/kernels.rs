//! Workload drivers that exercise the timing model end to end.
//!
//! The driver plays the role of the program under measurement: it seeds
//! operand memory directly, issues the instruction stream a simple compiler
//! would emit, and afterwards checks results and reads the counters back.

use std::fmt;

use anyhow::{ensure, Result};
use core_timing::{
    machine::Machine,
    op::{Dest, FpOp, FxOp, Instruction, Op},
};

pub struct TrialOutcome {
    pub m: u32,
    pub n: u32,
    pub pass: bool,
    pub operations: u64,
    pub cycles: u64,
    pub l1d_accesses: u64,
    pub l1d_hits: u64,
    pub l1d_misses: u64,
    pub l2_misses: u64,
    pub l3_misses: u64,
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M = {:>4}, N = {:>4} : instr = {:>6}, cyc = {:>8}, \
             L1D(access= {:>6}, hit = {:>6}, miss = {:>6}), \
             L2(miss = {:>6}), L3(miss = {:>6}) | {}",
            self.m,
            self.n,
            self.operations,
            self.cycles,
            self.l1d_accesses,
            self.l1d_hits,
            self.l1d_misses,
            self.l2_misses,
            self.l3_misses,
            if self.pass { "PASS" } else { "FAIL" }
        )
    }
}

/// One timed sgemv trial: y = A*x with A column-major m x n, x[j] = j and
/// A[i][j] = i, so y[i] must come out as i * n(n-1)/2.
pub fn sgemv_trial(machine: &mut Machine, m: u32, n: u32) -> Result<TrialOutcome> {
    ensure!(m > 0 && n > 0, "sgemv needs positive dimensions");
    let floats = u64::from(m) + u64::from(n) + u64::from(m) * u64::from(n);
    ensure!(
        floats * 4 <= machine.mem.len() as u64,
        "sgemv operands for {m} x {n} exceed the {} byte memory",
        machine.mem.len()
    );
    let y = 0u32;
    let x = y + m * 4;
    let a = x + n * 4;

    machine.zeromem();
    for i in 0..m {
        machine.mem.write_f32((y + i * 4) as usize, 0.0)?;
    }
    for j in 0..n {
        machine.mem.write_f32((x + j * 4) as usize, j as f32)?;
    }
    for i in 0..m {
        for j in 0..n {
            machine.mem.write_f32((a + (i + m * j) * 4) as usize, i as f32)?;
        }
    }

    machine.zeroctrs();
    sgemv(machine, y, a, x, m, n)?;
    machine.l2.clear();
    machine.l3.clear();

    let mut pass = true;
    for i in 0..m {
        let got = machine.mem.read_f32((y + i * 4) as usize)?;
        let want = (u64::from(i) * (u64::from(n) * u64::from(n - 1) / 2)) as f32;
        if got != want {
            log::warn!("y[{i}] = {got}, wanted {want}");
            pass = false;
        }
    }

    Ok(TrialOutcome {
        m,
        n,
        pass,
        operations: machine.counters.operations,
        cycles: machine.counters.cycles,
        l1d_accesses: machine.l1d.counters.accesses,
        l1d_hits: machine.l1d.counters.hits,
        l1d_misses: machine.l1d.counters.misses,
        l2_misses: machine.l2.counters.misses,
        l3_misses: machine.l3.counters.misses,
    })
}

/// Issue the sgemv instruction stream. The loop body lives at fixed fetch
/// addresses so the I-side hierarchy sees the re-execution a real program
/// would produce; the driver reads the count register after each `bc` to
/// steer its own control flow.
fn sgemv(machine: &mut Machine, y: u32, a: u32, x: u32, m: u32, n: u32) -> Result<()> {
    // r0 stays zero; r3 walks y, r4 walks a, r5 walks x, r8 counts rows
    machine.regs.gpr_mut(0).data = 0;
    machine.regs.gpr_mut(4).data = a;
    machine.regs.gpr_mut(5).data = x;
    for _ in 0..n {
        // f1 = x[j], advance the x cursor
        machine.issue(&Instruction::at(
            0x00,
            vec![
                Op::Load { dst: Dest::Fpr(1), ra: 5, disp: 0 },
                Op::Fx(FxOp::Addi { rt: 5, ra: 5, imm: 4 }),
            ],
        ))?;
        // r3 = &y[0], r8 = row count
        machine.issue(&Instruction::at(
            0x04,
            vec![Op::Fx(FxOp::Addi { rt: 3, ra: 0, imm: y as i32 })],
        ))?;
        machine.issue(&Instruction::at(
            0x08,
            vec![Op::Fx(FxOp::Addi { rt: 8, ra: 0, imm: m as i32 })],
        ))?;
        loop {
            // f0 = y[i]
            machine.issue(&Instruction::at(
                0x0c,
                vec![Op::Load { dst: Dest::Fpr(0), ra: 3, disp: 0 }],
            ))?;
            // f2 = a[i + m*j], advance the column cursor
            machine.issue(&Instruction::at(
                0x10,
                vec![
                    Op::Load { dst: Dest::Fpr(2), ra: 4, disp: 0 },
                    Op::Fx(FxOp::Addi { rt: 4, ra: 4, imm: 4 }),
                ],
            ))?;
            // f0 = f2 * f1 + f0
            machine.issue(&Instruction::at(
                0x14,
                vec![Op::Fp(FpOp::Fmadd { rt: 0, ra: 2, rb: 1, rc: 0 })],
            ))?;
            // y[i] = f0, advance the y cursor
            machine.issue(&Instruction::at(
                0x18,
                vec![
                    Op::Store { src: Dest::Fpr(0), ra: 3, disp: 0 },
                    Op::Fx(FxOp::Addi { rt: 3, ra: 3, imm: 4 }),
                ],
            ))?;
            machine.issue(&Instruction::at(0x1c, vec![Op::Bc { ctr: 8 }]))?;
            if machine.regs.gpr(8).data == 0 {
                break;
            }
        }
    }
    Ok(())
}
