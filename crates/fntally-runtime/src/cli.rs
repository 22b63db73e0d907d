//! CLI definition using clap derive.

use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fntally_core::DEFAULT_TOTAL_EXPECTED;

/// Default wait after launching the harness before the run is declared over.
pub const DEFAULT_SETTLE_MS: u64 = 10_000;

#[derive(Parser)]
#[command(name = "fntally", about = "Live verdict tally for function test harness output")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a harness and tally its verdicts
    Run(RunOpts),
    /// Classify lines without starting a run
    Classify(ClassifyOpts),
    /// List known function names in match order
    Registry,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunOpts {
    /// Number of function results the harness is expected to report
    #[arg(long, env = "FNTALLY_EXPECTED", default_value_t = DEFAULT_TOTAL_EXPECTED)]
    pub expected: NonZeroU32,

    /// Milliseconds to wait after launching the harness before finishing the run
    #[arg(long, env = "FNTALLY_SETTLE_MS", default_value_t = DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,

    /// Emit one JSON object per event instead of human-readable lines
    #[arg(long)]
    pub json: bool,

    /// Only show log lines containing this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Color output: auto, always, never
    #[arg(long, default_value = "auto")]
    pub color: String,

    /// Read harness output from a transcript file instead of stdin
    #[arg(long, short = 'i', conflicts_with = "command")]
    pub input: Option<PathBuf>,

    /// Harness command to launch (after `--`)
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            expected: DEFAULT_TOTAL_EXPECTED,
            settle_ms: DEFAULT_SETTLE_MS,
            json: false,
            filter: None,
            color: "auto".to_string(),
            input: None,
            command: Vec::new(),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClassifyOpts {
    /// Lines to classify
    #[arg(required = true)]
    pub lines: Vec<String>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["fntally", "run"]).expect("parse");
        let Some(Command::Run(opts)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(opts.expected, DEFAULT_TOTAL_EXPECTED);
        assert_eq!(opts.settle_ms, DEFAULT_SETTLE_MS);
        assert!(opts.command.is_empty());
        assert!(opts.input.is_none());
    }

    #[test]
    fn run_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "fntally", "run", "--expected", "120", "--", "luau", "unc.lua",
        ])
        .expect("parse");
        let Some(Command::Run(opts)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(opts.expected.get(), 120);
        assert_eq!(opts.command, vec!["luau", "unc.lua"]);
    }

    #[test]
    fn zero_expected_is_rejected() {
        assert!(Cli::try_parse_from(["fntally", "run", "--expected", "0"]).is_err());
    }

    #[test]
    fn input_conflicts_with_command() {
        let res = Cli::try_parse_from(["fntally", "run", "-i", "log.txt", "--", "luau"]);
        assert!(res.is_err());
    }
}
