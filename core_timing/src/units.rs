use std::fmt;

use crate::counters::Cycle;

/// A dispatch resource: holds only the cycle at which it can next accept
/// work. An operation in flight keeps its unit busy until that cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unit {
    pub ready: Cycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Ldu,
    Stu,
    Fxu,
    Fpu,
    Bru,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitKind::Ldu => "LDU",
            UnitKind::Stu => "STU",
            UnitKind::Fxu => "FXU",
            UnitKind::Fpu => "FPU",
            UnitKind::Bru => "BRU",
        };
        f.write_str(s)
    }
}

/// The five functional units of the modeled pipeline.
#[derive(Debug, Default)]
pub struct Units {
    pub ldu: Unit,
    pub stu: Unit,
    pub fxu: Unit,
    pub fpu: Unit,
    pub bru: Unit,
}

impl Units {
    pub fn get(&self, kind: UnitKind) -> &Unit {
        match kind {
            UnitKind::Ldu => &self.ldu,
            UnitKind::Stu => &self.stu,
            UnitKind::Fxu => &self.fxu,
            UnitKind::Fpu => &self.fpu,
            UnitKind::Bru => &self.bru,
        }
    }

    pub fn get_mut(&mut self, kind: UnitKind) -> &mut Unit {
        match kind {
            UnitKind::Ldu => &mut self.ldu,
            UnitKind::Stu => &mut self.stu,
            UnitKind::Fxu => &mut self.fxu,
            UnitKind::Fpu => &mut self.fpu,
            UnitKind::Bru => &mut self.bru,
        }
    }

    pub fn zero_ready(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_address_distinct_units() {
        let mut u = Units::default();
        u.get_mut(UnitKind::Fpu).ready = 9;
        assert_eq!(u.get(UnitKind::Fpu).ready, 9);
        assert_eq!(u.get(UnitKind::Fxu).ready, 0);
        u.zero_ready();
        assert_eq!(u.get(UnitKind::Fpu).ready, 0);
    }
}
