pub mod cache;
pub mod config;
pub mod counters;
pub mod machine;
pub mod memory;
pub mod op;
pub mod regfile;
pub mod units;

#[cfg(feature = "stat")]
pub mod stat;
