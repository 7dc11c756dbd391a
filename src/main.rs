//! shipmod - Script module packager and release version resolver
//!
//! - `build` assembles the module directory and its manifest
//! - `resolve` computes the next release version from a pull-request event
//! - `publish` resolves, publishes and creates the release

use clap::Parser;
use shipmod::cli::CliArgs;
use shipmod::orchestrator::Orchestrator;
use shipmod::output::{create_formatter, OutputConfig};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays parseable; `RUST_LOG` overrides the flags
fn init_logging(args: &CliArgs) {
    let default = if args.verbose {
        "shipmod=debug"
    } else if args.quiet || args.json {
        "warn"
    } else {
        "shipmod=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    let orchestrator = Orchestrator::new(args.path().clone(), config)?
        .with_progress(!args.quiet && !args.json);
    let report = orchestrator.run(&args.command).await?;

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.what_if);
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    // A skipped release is still a successful run
    Ok(())
}
