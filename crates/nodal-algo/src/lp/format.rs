//! CPLEX LP text export for inspecting a built problem.

use super::LpProblem;
use std::collections::HashSet;
use std::io::{self, Write};

const TERMS_PER_LINE: usize = 6;

/// Replace characters the LP format does not accept in identifiers.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "!\"#$%&()/,.;?@_`'{}|~".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        out.insert(0, '_');
    }
    out
}

/// Sanitized names, suffixed where sanitizing made two of them equal.
fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            let base = sanitize_name(name);
            let mut candidate = base.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                n += 1;
                candidate = format!("{}#{}", base, n);
            }
            candidate
        })
        .collect()
}

fn write_terms<W: Write>(out: &mut W, terms: &[(f64, &str)]) -> io::Result<()> {
    for (k, (coef, name)) in terms.iter().enumerate() {
        if k > 0 && k % TERMS_PER_LINE == 0 {
            write!(out, "\n   ")?;
        }
        let sign = if *coef < 0.0 { "-" } else { "+" };
        if k == 0 && sign == "+" {
            write!(out, " {} {}", coef.abs(), name)?;
        } else {
            write!(out, " {} {} {}", sign, coef.abs(), name)?;
        }
    }
    Ok(())
}

fn bound(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

/// Write `problem` in CPLEX LP format.
pub fn write_lp<W: Write>(problem: &LpProblem, out: &mut W) -> io::Result<()> {
    let columns = unique_names(problem.columns().iter().map(|c| c.name.as_str()));
    let rows = unique_names(problem.rows().iter().map(|r| r.name.as_str()));

    writeln!(out, "\\ nodal economic dispatch")?;
    writeln!(
        out,
        "\\ {} columns, {} rows",
        problem.num_columns(),
        problem.num_rows()
    )?;
    writeln!(out, "Minimize")?;
    let objective: Vec<(f64, &str)> = problem
        .columns()
        .iter()
        .zip(&columns)
        .filter(|(c, _)| c.cost != 0.0)
        .map(|(c, name)| (c.cost, name.as_str()))
        .collect();
    write!(out, " obj:")?;
    if objective.is_empty() {
        if let Some(first) = columns.first() {
            write!(out, " 0 {}", first)?;
        }
    } else {
        write_terms(out, &objective)?;
    }
    writeln!(out)?;

    writeln!(out, "Subject To")?;
    for (row, name) in problem.rows().iter().zip(&rows) {
        let terms: Vec<(f64, &str)> = row
            .coefficients
            .iter()
            .map(|&(j, a)| (a, columns[j].as_str()))
            .collect();
        write!(out, " {}:", name)?;
        if terms.is_empty() {
            match columns.first() {
                Some(first) => write!(out, " 0 {}", first)?,
                None => write!(out, " 0")?,
            }
        } else {
            write_terms(out, &terms)?;
        }
        writeln!(out, " {} {}", row.sense.symbol(), row.rhs)?;
    }

    writeln!(out, "Bounds")?;
    for (column, name) in problem.columns().iter().zip(&columns) {
        match (column.lower.is_finite(), column.upper.is_finite()) {
            (false, false) => writeln!(out, " {} free", name)?,
            (true, false) => writeln!(out, " {} >= {}", name, column.lower)?,
            _ => writeln!(
                out,
                " {} <= {} <= {}",
                bound(column.lower),
                name,
                bound(column.upper)
            )?,
        }
    }
    writeln!(out, "End")?;
    Ok(())
}
