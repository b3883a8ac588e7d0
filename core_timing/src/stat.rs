//! Aggregation and pretty-printing of run statistics.

use std::fmt;

/// One reportable statistic: a header naming it and a Display body.
pub trait Stat: fmt::Display {
    fn header(&self) -> &'static str;
}

/// Components that contribute statistics push them into a [`Stats`] buffer.
pub trait AddStats {
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl Extend<Box<dyn Stat>> for Stats {
    fn extend<T: IntoIterator<Item = Box<dyn Stat>>>(&mut self, iter: T) {
        self.stats.extend(iter)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .stats
            .iter()
            .map(|s| s.header().len())
            .max()
            .unwrap_or(0)
            .max(44);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for s in &self.stats {
            writeln!(f, "{}:", s.header())?;
            writeln!(f, "{s}")?;
        }
        write!(f, "{:-<width$}", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl fmt::Display for Fixed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  value: 1")
        }
    }

    impl Stat for Fixed {
        fn header(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn report_lists_every_stat_under_a_banner() {
        let mut ss = Stats::default();
        ss.push(Box::new(Fixed("alpha")));
        ss.push(Box::new(Fixed("beta")));
        let out = ss.to_string();
        assert!(out.contains(" statistics "));
        assert!(out.contains("alpha:"));
        assert!(out.contains("beta:"));
    }
}
