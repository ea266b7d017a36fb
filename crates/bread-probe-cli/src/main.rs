//! bread-probe: BREAD acceptance tests for a calculation web app
//!
//! ## Usage
//!
//! ```bash
//! bread-probe list                          # Show scenarios
//! bread-probe run                           # Run all scenarios
//! bread-probe run --filter crud -j 1        # One scenario, serially
//! bread-probe run --format json > run.json  # Machine-readable results
//! ```

use bread_probe_cli::{
    Cli, CliConfig, CliError, CliResult, Commands, RunArgs, ScenarioRunner, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    match cli.command {
        Commands::Run(args) => run_scenarios(config, &args),
        Commands::List => {
            ScenarioRunner::list();
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let format = match &cli.command {
        Commands::Run(args) => args.format.into(),
        Commands::List => bread_probe_cli::OutputFormat::Text,
    };
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_format(format)
        .with_log_json(cli.log_json)
}

/// `RUST_LOG` wins over the verbosity flags
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_json {
        builder.json().init();
    } else {
        builder
            .with_target(config.verbosity.is_debug())
            .with_ansi(config.color.should_color())
            .init();
    }
}

fn run_scenarios(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::test_execution(format!("Failed to create runtime: {e}")))?;
    let mut runner = ScenarioRunner::new(config);
    rt.block_on(runner.run(args)).map(|_| ())
}
