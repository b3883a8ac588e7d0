mod kernels;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use core_timing::{config::MachineConfig, machine::Machine};
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// time a matrix-vector multiply against the modeled pipeline
    Sgemv(SgemvArgs),
}

#[derive(Args, Debug)]
struct SgemvArgs {
    /// Number of rows (sweeps the built-in size ranges when omitted)
    #[arg(short, long)]
    m: Option<u32>,
    /// Number of columns (defaults to the row count)
    #[arg(short, long)]
    n: Option<u32>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Emit one JSON object per trial instead of text report lines
    #[arg(long)]
    json: bool,
    /// Dump the register files after the last trial
    #[arg(long)]
    dump_regs: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Sgemv(args) => run_sgemv(args),
    }
}

fn run_sgemv(args: SgemvArgs) -> Result<()> {
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    let mut machine = Machine::new(MachineConfig::default());
    if !args.json {
        print_geometry(&machine);
    }
    let trials = match (args.m, args.n) {
        (Some(m), n) => vec![(m, n.unwrap_or(m))],
        (None, Some(n)) => vec![(n, n)],
        (None, None) => sweep(),
    };
    for &(m, n) in &trials {
        let outcome = kernels::sgemv_trial(&mut machine, m, n)?;
        if args.json {
            let line = serde_json::json!({
                "m": m,
                "n": n,
                "pass": outcome.pass,
                "stats": machine.snapshot(),
            });
            println!("{line}");
        } else {
            println!("{outcome}");
        }
    }
    if args.dump_regs {
        let width = terminal_size().map_or(120, |(w, _)| w.0 as usize);
        println!("{}", machine.regs.view((width / 26).max(1)));
    }
    output_stat(&machine);
    Ok(())
}

fn print_geometry(machine: &Machine) {
    for s in machine.snapshot().caches {
        println!(
            "{}: {} bytes of capacity, {} sets, {}-way set associative, {}-byte line size",
            s.name, s.capacity, s.nsets, s.nways, s.linesize
        );
    }
}

/// The two geometric size ranges of the reference driver: square-ish shapes
/// up to 64 rows, then short-and-wide shapes out to 1024 columns.
fn sweep() -> Vec<(u32, u32)> {
    let mut trials = Vec::new();
    let mut m = 4;
    while m <= 64 {
        let mut n = m;
        while n <= 2 * m {
            trials.push((m, n));
            n *= 2;
        }
        m *= 2;
    }
    let mut m = 4;
    while m <= 8 {
        let mut n = m;
        while n <= 1024 {
            trials.push((m, n));
            n *= 2;
        }
        m *= 2;
    }
    trials
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Machine) {}

#[cfg(feature = "stat")]
fn output_stat(machine: &Machine) {
    log::info!("statistics:\n{}", machine.collect_stat());
}
