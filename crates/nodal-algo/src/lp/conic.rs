//! Clarabel interior-point backend.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    ½xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! An LP maps onto it with `P = 0`. Equality rows go to the zero cone; `≤`
//! rows, negated `≥` rows and finite column bounds go to the non-negative
//! cone. With this layout the sensitivity of the optimum to `b` is `−z`.

use super::{LpBackend, LpError, LpOutcome, LpProblem, LpSolution, RowSense, SolverConfig};
use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT},
};
use tracing::{debug, warn};

/// Pure-Rust interior-point backend. Always available when the
/// `solver-clarabel` feature is on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

/// One row of `Ax + s = b`.
struct ConicRow {
    entries: Vec<(usize, f64)>,
    b: f64,
    /// Problem row and the sign it was multiplied by
    origin: Option<(usize, f64)>,
}

fn numerical(message: String) -> LpError {
    LpError::Numerical {
        backend: "clarabel".into(),
        message,
    }
}

impl LpBackend for ClarabelBackend {
    fn id(&self) -> &str {
        "clarabel"
    }

    fn solve(&self, problem: &LpProblem, config: &SolverConfig) -> Result<LpOutcome, LpError> {
        problem.validate()?;
        let n = problem.num_columns();
        let matrix = problem.constraint_matrix();

        let row_entries = |i: usize, sign: f64| -> Vec<(usize, f64)> {
            matrix
                .outer_view(i)
                .map(|view| view.iter().map(|(j, &a)| (j, sign * a)).collect())
                .unwrap_or_default()
        };

        let mut equalities = Vec::new();
        let mut inequalities = Vec::new();
        for (i, row) in problem.rows().iter().enumerate() {
            let sign = match row.sense {
                RowSense::GreaterEqual => -1.0,
                RowSense::LessEqual | RowSense::Equal => 1.0,
            };
            let conic = ConicRow {
                entries: row_entries(i, sign),
                b: sign * row.rhs,
                origin: Some((i, sign)),
            };
            match row.sense {
                RowSense::Equal => equalities.push(conic),
                _ => inequalities.push(conic),
            }
        }
        for (j, column) in problem.columns().iter().enumerate() {
            if column.upper.is_finite() {
                inequalities.push(ConicRow {
                    entries: vec![(j, 1.0)],
                    b: column.upper,
                    origin: None,
                });
            }
            if column.lower.is_finite() {
                inequalities.push(ConicRow {
                    entries: vec![(j, -1.0)],
                    b: -column.lower,
                    origin: None,
                });
            }
        }

        let n_eq = equalities.len();
        let n_ineq = inequalities.len();
        let conic_rows: Vec<ConicRow> = equalities.into_iter().chain(inequalities).collect();
        let m = conic_rows.len();

        if m == 0 {
            // Every column is free and unconstrained.
            if problem.columns().iter().any(|c| c.cost != 0.0) {
                return Ok(LpOutcome::Unbounded { iterations: 0 });
            }
            return Ok(LpOutcome::Optimal(LpSolution {
                x: vec![0.0; n],
                row_duals: Vec::new(),
                reduced_costs: problem.reduced_costs(&[]),
                objective: 0.0,
                iterations: 0,
            }));
        }

        // CSC assembly: bucket entries by column; rows arrive in order.
        let mut by_column: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (k, row) in conic_rows.iter().enumerate() {
            for &(j, a) in &row.entries {
                by_column[j].push((k, a));
            }
        }
        let mut col_ptr = Vec::with_capacity(n + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for column in &by_column {
            col_ptr.push(row_idx.len());
            for &(k, a) in column {
                row_idx.push(k);
                values.push(a);
            }
        }
        col_ptr.push(row_idx.len());

        let a_mat = CscMatrix::new(m, n, col_ptr, row_idx, values);
        let p_mat = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let q = problem.objective();
        let b: Vec<f64> = conic_rows.iter().map(|r| r.b).collect();

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_ineq));
        }

        let max_iter = u32::try_from(config.max_iterations).unwrap_or(u32::MAX);
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(max_iter)
            .build()
            .map_err(|e| numerical(format!("settings error: {:?}", e)))?;

        debug!(rows = m, columns = n, equalities = n_eq, "clarabel solve");
        let mut solver = DefaultSolver::new(&p_mat, &q, &a_mat, &b, &cones, settings)
            .map_err(|e| numerical(format!("initialization failed: {:?}", e)))?;
        solver.solve();

        let sol = solver.solution;
        let iterations = sol.iterations as usize;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                return Ok(LpOutcome::Infeasible { iterations })
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                return Ok(LpOutcome::Unbounded { iterations })
            }
            SolverStatus::MaxIterations => {
                return Ok(LpOutcome::IterationLimitExceeded { iterations })
            }
            other => {
                warn!(status = ?other, "clarabel stopped without a usable solution");
                return Err(numerical(format!("solver returned status {:?}", other)));
            }
        }

        let mut row_duals = vec![0.0; problem.num_rows()];
        for (row, z) in conic_rows.iter().zip(&sol.z) {
            if let Some((i, sign)) = row.origin {
                row_duals[i] = -sign * z;
            }
        }
        let x = sol.x;
        let reduced_costs = problem.reduced_costs(&row_duals);
        Ok(LpOutcome::Optimal(LpSolution {
            objective: problem.objective_value(&x),
            x,
            row_duals,
            reduced_costs,
            iterations,
        }))
    }
}
