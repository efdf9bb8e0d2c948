pub mod cli;
pub mod exit;
pub mod report;

pub use cli::{build_cli_command, BackendArg, Cli, Commands, OutputFormat, SolverArgs};
pub use exit::ExitCode;
