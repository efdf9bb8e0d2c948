use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use nodal_algo::BackendKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nodal", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (RUST_LOG directives are applied on top)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve a case and report dispatch, line flows and regional prices
    Solve {
        /// Case file (.toml or .json), or `-` to read from stdin
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        #[command(flatten)]
        solver: SolverArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write the report to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Summarize a case and report model diagnostics without solving it
    Inspect {
        /// Case file (.toml or .json), or `-` to read from stdin
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write the dispatch LP in CPLEX LP format
    Lp {
        /// Case file (.toml or .json), or `-` to read from stdin
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
        /// Write the LP to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

/// Solver flags. Each one overrides the case file and `NODAL_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct SolverArgs {
    /// LP backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
    /// Iteration limit
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Zero tolerance (scaled by problem magnitude)
    #[arg(long)]
    pub tolerance: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    /// Dense two-phase simplex
    Simplex,
    /// Clarabel interior point
    Clarabel,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Simplex => BackendKind::Simplex,
            BackendArg::Clarabel => BackendKind::Clarabel,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned tables with unit labels
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
