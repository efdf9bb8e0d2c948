use std::path::Path;

use anyhow::Result;
use nodal_algo::{DispatchError, DispatchProblem};
use nodal_cli::report::{failure_text, solution_table, SolveReport};
use nodal_cli::{ExitCode, OutputFormat, SolverArgs};
use tracing::info;

use super::util::{emit, read_case, resolve_settings};

pub fn handle(
    path: &Path,
    args: &SolverArgs,
    format: OutputFormat,
    out: Option<&Path>,
) -> Result<ExitCode> {
    let mut case = read_case(path)?;
    resolve_settings(&mut case.solver, args)?;
    info!(
        backend = %case.solver.backend,
        max_iterations = case.solver.max_iterations,
        tolerance = case.solver.tolerance,
        "solving dispatch"
    );

    let backend = case.solver.backend.create()?;
    let mut problem = DispatchProblem::new(&case.network);
    let status = problem.solve(backend.as_ref(), &case.solver.solver_config())?;
    let name = case.name.as_deref();

    match problem.solution() {
        Ok(solution) => {
            let text = match format {
                OutputFormat::Table => solution_table(name, &solution)?,
                OutputFormat::Json => render_json(&SolveReport {
                    case: name,
                    status,
                    message: None,
                    solution: Some(&solution),
                    infeasibility: None,
                })?,
            };
            emit(&text, out)?;
            Ok(ExitCode::from_status(status))
        }
        Err(err) => {
            let Some(status) = err.status() else {
                return Err(err.into());
            };
            let report = match &err {
                DispatchError::Infeasible(report) => Some(report.as_ref()),
                _ => None,
            };
            let message = err.to_string();
            eprint!("{}", failure_text(status, &message, report));
            if format == OutputFormat::Json {
                let text = render_json(&SolveReport {
                    case: name,
                    status,
                    message: Some(message),
                    solution: None,
                    infeasibility: report,
                })?;
                emit(&text, out)?;
            }
            Ok(ExitCode::from_status(status))
        }
    }
}

fn render_json(report: &SolveReport<'_>) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(report)?))
}
