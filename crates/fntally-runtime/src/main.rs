//! fntally: live verdict tally for function test harness output.
//! Drives one run of the core aggregator and renders its events.

use std::sync::Arc;

use clap::Parser;
use fntally_core::{FunctionRegistry, MessageClassifier, SessionAggregator};

mod capture;
mod cli;
mod cmd_classify;
mod config;
mod driver;
mod harness;
mod report;

fn init_logging() {
    let filter = std::env::var("FNTALLY_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(dispatch(args));
    // A stdin read parked on the blocking pool never returns while upstream
    // keeps the pipe open; do not wait for it.
    runtime.shutdown_background();
    result
}

async fn dispatch(args: cli::Cli) -> anyhow::Result<()> {
    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Run(cli::RunOpts::default()));
    let registry = Arc::new(FunctionRegistry::builtin());

    match command {
        cli::Command::Run(opts) => {
            let use_color = config::resolve_color(&opts.color);
            let config = config::RunConfig::from_opts(&opts, use_color);
            let mut agg = SessionAggregator::new(registry);
            let slot = capture::OutputSlot::passthrough();
            let mut reporter =
                report::Reporter::new(std::io::stdout(), config.output, config.filter.clone());

            driver::run_session(
                &mut agg,
                &config,
                config.harness.clone(),
                &slot,
                &mut reporter,
            )
            .await?;
            reporter.summary(agg.session());
        }
        cli::Command::Classify(opts) => {
            let classifier = MessageClassifier::new(registry);
            let output = cmd_classify::format_classifications(&classifier, &opts.lines, opts.json)?;
            println!("{output}");
        }
        cli::Command::Registry => {
            for name in registry.iter() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
