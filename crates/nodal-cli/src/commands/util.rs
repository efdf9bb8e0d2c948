use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nodal_algo::BackendKind;
use nodal_io::{load_case, parse_case_auto, Case, SolverSettings};
use tracing::warn;

use nodal_cli::SolverArgs;

/// Load a case from a file, or from stdin when the path is `-`.
pub fn read_case(path: &Path) -> Result<Case> {
    let case = if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("reading case from stdin")?;
        parse_case_auto(&content).context("loading case from stdin")?
    } else {
        load_case(path)?
    };
    for issue in case.diagnostics.warnings() {
        warn!("{}", issue);
    }
    Ok(case)
}

/// Overlay `NODAL_*` variables and then the command-line flags.
pub fn resolve_settings(settings: &mut SolverSettings, args: &SolverArgs) -> Result<()> {
    settings
        .apply_env()
        .context("applying NODAL_* environment overrides")?;
    if let Some(backend) = args.backend {
        settings.backend = BackendKind::from(backend);
    }
    if let Some(max_iterations) = args.max_iterations {
        settings.max_iterations = max_iterations;
    }
    if let Some(tolerance) = args.tolerance {
        settings.tolerance = tolerance;
    }
    settings.validate().context("invalid solver flags")?;
    Ok(())
}

/// Write `content` to `out`, or to stdout.
pub fn emit(content: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("writing '{}'", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
