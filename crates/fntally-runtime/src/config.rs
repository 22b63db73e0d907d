//! Run configuration resolved from CLI options and environment.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use fntally_core::LogFilter;
use tokio::time::Instant;

use crate::cli::RunOpts;

/// When a run is declared over. The harness gives no completion signal, so
/// the only policy is a fixed wait measured from harness launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    FixedDelay(Duration),
}

impl CompletionPolicy {
    pub fn deadline(&self, launched_at: Instant) -> Instant {
        match *self {
            Self::FixedDelay(delay) => launched_at + delay,
        }
    }
}

/// Where harness output comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessSource {
    Stdin,
    File(PathBuf),
    Command { program: String, args: Vec<String> },
}

impl HarnessSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Command { program, args } if args.is_empty() => program.clone(),
            Self::Command { program, args } => format!("{program} {}", args.join(" ")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human { color: bool },
    Json,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub total_expected: NonZeroU32,
    pub completion: CompletionPolicy,
    pub output: OutputMode,
    pub filter: LogFilter,
    pub harness: HarnessSource,
}

impl RunConfig {
    pub fn from_opts(opts: &RunOpts, use_color: bool) -> Self {
        let harness = match (opts.command.split_first(), &opts.input) {
            (Some((program, args)), _) => HarnessSource::Command {
                program: program.clone(),
                args: args.to_vec(),
            },
            (None, Some(path)) => HarnessSource::File(path.clone()),
            (None, None) => HarnessSource::Stdin,
        };
        let output = if opts.json {
            OutputMode::Json
        } else {
            OutputMode::Human { color: use_color }
        };
        Self {
            total_expected: opts.expected,
            completion: CompletionPolicy::FixedDelay(Duration::from_millis(opts.settle_ms)),
            output,
            filter: opts.filter.as_deref().map(LogFilter::new).unwrap_or_default(),
            harness,
        }
    }
}

/// Resolve `--color` against the terminal.
pub fn resolve_color(color: &str) -> bool {
    use std::io::IsTerminal;
    match color {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}
