//! CLI command definitions using clap

use bread_probe::{CreationMode, InvalidInputPolicy};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bread-probe: BREAD acceptance tests for a calculation web app
#[derive(Parser, Debug)]
#[command(name = "bread-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the application
    Run(RunArgs),

    /// List available scenarios
    List,
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Only scenarios whose name contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Root URL of the application
    #[arg(long, env = "BREAD_BASE_URL")]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long, env = "BREAD_HEADED")]
    pub headed: bool,

    /// Scenarios run concurrently (default: all)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// How the crud scenario creates its first calculation
    #[arg(long)]
    pub creation_mode: Option<CreationModeArg>,

    /// Grading of invalid inputs that produce no validation message
    #[arg(long)]
    pub invalid_inputs: Option<InvalidInputsArg>,

    /// Bound on client-side transitions in milliseconds
    #[arg(long)]
    pub settle_timeout: Option<u64>,

    /// Bound on each locator strategy in milliseconds
    #[arg(long)]
    pub attempt_timeout: Option<u64>,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<PathBuf>,

    /// Disable the Chromium sandbox
    #[arg(long)]
    pub no_sandbox: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// `SuiteResults` as JSON on stdout
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Creation path argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CreationModeArg {
    /// Dashboard form
    Ui,
    /// `POST /calculations`
    Api,
}

impl From<CreationModeArg> for CreationMode {
    fn from(arg: CreationModeArg) -> Self {
        match arg {
            CreationModeArg::Ui => Self::Ui,
            CreationModeArg::Api => Self::Api,
        }
    }
}

/// Invalid-input grading argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum InvalidInputsArg {
    /// Fail the scenario
    Strict,
    /// Report a warning
    Warn,
}

impl From<InvalidInputsArg> for InvalidInputPolicy {
    fn from(arg: InvalidInputsArg) -> Self {
        match arg {
            InvalidInputsArg::Strict => Self::Strict,
            InvalidInputsArg::Warn => Self::Warn,
        }
    }
}
