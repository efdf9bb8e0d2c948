use std::path::Path;

use anyhow::Result;
use nodal_cli::report::{inspect_table, InspectReport};
use nodal_cli::{ExitCode, OutputFormat};

use super::util::{emit, read_case};

pub fn handle(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let case = read_case(path)?;
    let report = InspectReport::new(&case);
    let text = match format {
        OutputFormat::Table => inspect_table(&report, &case.network)?,
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
    };
    emit(&text, None)?;
    Ok(ExitCode::Success)
}
