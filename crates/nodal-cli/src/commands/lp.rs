use std::path::Path;

use anyhow::Result;
use nodal_algo::{build_lp, write_lp};
use nodal_cli::ExitCode;
use tracing::info;

use super::util::{emit, read_case};

pub fn handle(path: &Path, out: Option<&Path>) -> Result<ExitCode> {
    let case = read_case(path)?;
    let (lp, _) = build_lp(&case.network);
    info!(
        columns = lp.num_columns(),
        rows = lp.num_rows(),
        "built dispatch LP"
    );

    let mut buffer = Vec::new();
    write_lp(&lp, &mut buffer)?;
    emit(&String::from_utf8(buffer)?, out)?;
    Ok(ExitCode::Success)
}
