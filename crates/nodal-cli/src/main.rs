use clap::Parser;
use nodal_cli::{Cli, Commands, ExitCode};
use std::io;

mod commands;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level.into()),
        )
        .with_writer(io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Solve {
            case,
            solver,
            format,
            out,
        } => commands::solve::handle(case, solver, *format, out.as_deref()),
        Commands::Inspect { case, format } => commands::inspect::handle(case, *format),
        Commands::Lp { case, out } => commands::lp::handle(case, out.as_deref()),
    };

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::Failure.into()
        }
    }
}
