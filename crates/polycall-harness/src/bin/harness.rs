//! CLI entrypoint for the polycall harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use polycall_bridge::{TopologyMatrix, TraceMode};
use polycall_harness::{StormConfig, TopologyReport, run_storm};

/// Stress and inspection tooling for the polycall bridge.
#[derive(Debug, Parser)]
#[command(name = "polycall-harness")]
#[command(about = "Transition storms and topology inspection for polycall")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive random transitions from many threads and report the outcome.
    Storm {
        /// Worker threads.
        #[arg(long, default_value_t = 4)]
        threads: usize,
        /// Transitions attempted per worker.
        #[arg(long, default_value_t = 1000)]
        iterations: usize,
        /// Root seed (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        /// Topology rules, e.g. `all` or `python->go, go<->nodejs`.
        #[arg(long, default_value = "all")]
        topology: String,
        /// Trace mode: `off`, `failures` or `all`.
        #[arg(long, default_value = "failures")]
        trace: String,
        /// Write the JSONL trace log here.
        #[arg(long)]
        trace_log: Option<PathBuf>,
        /// Output report path (if omitted, prints to stdout).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Exit nonzero if the interpreter lock or a handle scope leaked.
        #[arg(long)]
        strict: bool,
    },
    /// Parse topology rules and print the permitted edges as JSON.
    Topology {
        /// Topology rules.
        rules: String,
    },
}

fn parse_seed(raw: &str) -> Result<u64, std::num::ParseIntError> {
    let cleaned = raw.replace('_', "");
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Storm {
            threads,
            iterations,
            seed,
            topology,
            trace,
            trace_log,
            report,
            strict,
        } => {
            let config = StormConfig {
                threads,
                iterations,
                seed: parse_seed(&seed)?,
                topology,
                trace_mode: TraceMode::from_str_loose(&trace),
            };
            eprintln!(
                "Storm: {threads} threads x {iterations} transitions over `{}`",
                config.topology
            );
            let run = run_storm(&config)?;
            let mut storm_report = run.report;

            if let Some(path) = &trace_log {
                std::fs::write(path, &run.trace_log)?;
                storm_report.trace = storm_report
                    .trace
                    .map(|digest| digest.with_path(path.display().to_string()));
            }

            let json = storm_report.to_json_pretty()?;
            match &report {
                Some(path) => {
                    std::fs::write(path, json)?;
                    eprintln!("Wrote report to {}", path.display());
                }
                None => println!("{json}"),
            }
            eprintln!(
                "Storm complete: {} attempted, {} completed, {} failed",
                storm_report.stats.attempted,
                storm_report.stats.completed,
                storm_report.failures()
            );

            if strict
                && (storm_report.python_lock_outstanding != 0 || storm_report.node_open_scopes != 0)
            {
                return Err(format!(
                    "runtime leak: {} interpreter lock acquisitions, {} handle scopes outstanding",
                    storm_report.python_lock_outstanding, storm_report.node_open_scopes
                )
                .into());
            }
        }
        Command::Topology { rules } => {
            let matrix: TopologyMatrix = rules.parse()?;
            let report = TopologyReport::of(&matrix);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
