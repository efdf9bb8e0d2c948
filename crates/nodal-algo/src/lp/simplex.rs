//! Dense two-phase primal simplex.
//!
//! The problem is first rewritten in standard form `A s = b, s ≥ 0, b ≥ 0`:
//!
//! - a column with a finite lower bound is shifted, `x = l + s`, and a finite
//!   upper bound becomes an extra row `s ≤ u − l`;
//! - a column bounded only above is mirrored, `x = u − s`;
//! - a free column is split, `x = s⁺ − s⁻`;
//! - `≤` rows get a slack, `≥` rows a surplus, and rows with a negative
//!   right-hand side are negated.
//!
//! Phase 1 minimizes the sum of artificial variables; a positive optimum means
//! the problem is infeasible. Phase 2 minimizes the real objective with the
//! artificials barred from entering. Both phases use Bland's rule (lowest
//! eligible index enters, ties in the ratio test go to the lowest basic
//! index), so degenerate problems cannot cycle.
//!
//! Row duals are recovered from the final basis by solving `Bᵀy = c_B` with a
//! dense LU factorization.

use super::{LpBackend, LpError, LpOutcome, LpProblem, LpSolution, RowSense, SolverConfig};
use faer::{prelude::*, solvers::PartialPivLu, Mat};
use tracing::debug;

/// Smallest pivot magnitude accepted in either phase.
const PIVOT_FLOOR: f64 = 1e-12;

/// The built-in simplex backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexBackend;

impl LpBackend for SimplexBackend {
    fn id(&self) -> &str {
        "simplex"
    }

    fn solve(&self, problem: &LpProblem, config: &SolverConfig) -> Result<LpOutcome, LpError> {
        problem.validate()?;
        let eps = (config.tolerance * problem.magnitude()).max(PIVOT_FLOOR);
        let mut standard = StandardForm::new(problem);
        debug!(
            rows = standard.tableau.len(),
            columns = standard.n_total,
            artificials = standard.n_total - standard.first_artificial,
            "simplex standard form"
        );

        let mut iterations = 0;
        let max_iterations = config.max_iterations;

        if standard.first_artificial < standard.n_total {
            let cost: Vec<f64> = (0..standard.n_total)
                .map(|j| if standard.is_artificial(j) { 1.0 } else { 0.0 })
                .collect();
            let allowed = vec![true; standard.n_total];
            match standard.run(&cost, &allowed, eps, &mut iterations, max_iterations) {
                PhaseEnd::Optimal => {}
                PhaseEnd::Unbounded => {
                    return Err(LpError::Numerical {
                        backend: "simplex".into(),
                        message: "phase 1 reported an unbounded ray".into(),
                    })
                }
                PhaseEnd::IterationLimit => {
                    return Ok(LpOutcome::IterationLimitExceeded { iterations })
                }
            }

            let infeasibility = standard.artificial_sum();
            debug!(infeasibility, iterations, "simplex phase 1 finished");
            if infeasibility > eps {
                return Ok(LpOutcome::Infeasible { iterations });
            }
            standard.drive_out_artificials(eps);
        }

        let allowed: Vec<bool> = (0..standard.n_total)
            .map(|j| !standard.is_artificial(j))
            .collect();
        let cost = standard.phase2_cost.clone();
        match standard.run(&cost, &allowed, eps, &mut iterations, max_iterations) {
            PhaseEnd::Optimal => {}
            PhaseEnd::Unbounded => return Ok(LpOutcome::Unbounded { iterations }),
            PhaseEnd::IterationLimit => {
                return Ok(LpOutcome::IterationLimitExceeded { iterations })
            }
        }
        debug!(iterations, "simplex phase 2 finished");

        let x = standard.primal();
        let row_duals = standard.row_duals(problem.num_rows())?;
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

enum PhaseEnd {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// How an original column is expressed in standard-form variables.
#[derive(Debug, Clone, Copy)]
enum Mapping {
    /// x = offset + s
    Shifted { col: usize, offset: f64 },
    /// x = offset − s
    Mirrored { col: usize, offset: f64 },
    /// x = s⁺ − s⁻
    Split { pos: usize, neg: usize },
}

struct StandardForm {
    mappings: Vec<Mapping>,
    /// Original standard-form matrix, kept for the dual solve
    matrix: Vec<Vec<f64>>,
    tableau: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    basis: Vec<usize>,
    /// Problem row each standard row came from, `None` for bound rows
    origin: Vec<Option<usize>>,
    flipped: Vec<bool>,
    phase2_cost: Vec<f64>,
    first_artificial: usize,
    n_total: usize,
}

struct PendingRow {
    coefficients: Vec<f64>,
    sense: RowSense,
    rhs: f64,
    origin: Option<usize>,
}

impl StandardForm {
    fn new(problem: &LpProblem) -> Self {
        let mut mappings = Vec::with_capacity(problem.num_columns());
        let mut structural_cost = Vec::new();
        let mut bound_rows = Vec::new();

        for column in problem.columns() {
            let next = structural_cost.len();
            let mapping = match (column.lower.is_finite(), column.upper.is_finite()) {
                (true, upper_finite) => {
                    structural_cost.push(column.cost);
                    if upper_finite {
                        bound_rows.push((next, column.upper - column.lower));
                    }
                    Mapping::Shifted {
                        col: next,
                        offset: column.lower,
                    }
                }
                (false, true) => {
                    structural_cost.push(-column.cost);
                    Mapping::Mirrored {
                        col: next,
                        offset: column.upper,
                    }
                }
                (false, false) => {
                    structural_cost.push(column.cost);
                    structural_cost.push(-column.cost);
                    Mapping::Split {
                        pos: next,
                        neg: next + 1,
                    }
                }
            };
            mappings.push(mapping);
        }
        let n_structural = structural_cost.len();

        let matrix = problem.constraint_matrix();
        let mut pending = Vec::with_capacity(problem.num_rows() + bound_rows.len());
        for (i, row) in problem.rows().iter().enumerate() {
            let mut coefficients = vec![0.0; n_structural];
            let mut rhs = row.rhs;
            if let Some(view) = matrix.outer_view(i) {
                for (j, &a) in view.iter() {
                    match mappings[j] {
                        Mapping::Shifted { col, offset } => {
                            coefficients[col] += a;
                            rhs -= a * offset;
                        }
                        Mapping::Mirrored { col, offset } => {
                            coefficients[col] -= a;
                            rhs -= a * offset;
                        }
                        Mapping::Split { pos, neg } => {
                            coefficients[pos] += a;
                            coefficients[neg] -= a;
                        }
                    }
                }
            }
            pending.push(PendingRow {
                coefficients,
                sense: row.sense,
                rhs,
                origin: Some(i),
            });
        }
        for (col, width) in bound_rows {
            let mut coefficients = vec![0.0; n_structural];
            coefficients[col] = 1.0;
            pending.push(PendingRow {
                coefficients,
                sense: RowSense::LessEqual,
                rhs: width,
                origin: None,
            });
        }

        // Slack / surplus columns follow the structural ones.
        let mut next = n_structural;
        let slacks: Vec<Option<(usize, f64)>> = pending
            .iter()
            .map(|row| {
                let sign = match row.sense {
                    RowSense::LessEqual => 1.0,
                    RowSense::GreaterEqual => -1.0,
                    RowSense::Equal => return None,
                };
                next += 1;
                Some((next - 1, sign))
            })
            .collect();
        let first_artificial = next;

        // Each row starts with a unit basic column: its slack if that has a +1
        // after sign normalization, otherwise a fresh artificial.
        let flipped: Vec<bool> = pending.iter().map(|row| row.rhs < 0.0).collect();
        let mut basis = Vec::with_capacity(pending.len());
        for (r, &slack) in slacks.iter().enumerate() {
            let unit = slack
                .filter(|&(_, sign)| if flipped[r] { sign < 0.0 } else { sign > 0.0 })
                .map(|(col, _)| col);
            match unit {
                Some(col) => basis.push(col),
                None => {
                    basis.push(next);
                    next += 1;
                }
            }
        }
        let n_total = next;

        let mut tableau = Vec::with_capacity(pending.len());
        let mut rhs = Vec::with_capacity(pending.len());
        let mut origin = Vec::with_capacity(pending.len());
        for (r, row) in pending.into_iter().enumerate() {
            let sign = if flipped[r] { -1.0 } else { 1.0 };
            let mut dense = vec![0.0; n_total];
            for (j, a) in row.coefficients.into_iter().enumerate() {
                dense[j] = sign * a;
            }
            if let Some((col, s)) = slacks[r] {
                dense[col] = sign * s;
            }
            if basis[r] >= first_artificial {
                dense[basis[r]] = 1.0;
            }
            tableau.push(dense);
            rhs.push(sign * row.rhs);
            origin.push(row.origin);
        }

        let mut phase2_cost = vec![0.0; n_total];
        phase2_cost[..n_structural].copy_from_slice(&structural_cost);

        Self {
            mappings,
            matrix: tableau.clone(),
            tableau,
            rhs,
            basis,
            origin,
            flipped,
            phase2_cost,
            first_artificial,
            n_total,
        }
    }

    fn is_artificial(&self, col: usize) -> bool {
        col >= self.first_artificial
    }

    fn artificial_sum(&self) -> f64 {
        self.basis
            .iter()
            .zip(&self.rhs)
            .filter(|(b, _)| self.is_artificial(**b))
            .map(|(_, &v)| v)
            .sum()
    }

    /// Minimize `cost` from the current basis, entering only `allowed` columns.
    fn run(
        &mut self,
        cost: &[f64],
        allowed: &[bool],
        eps: f64,
        iterations: &mut usize,
        max_iterations: usize,
    ) -> PhaseEnd {
        let mut reduced = cost.to_vec();
        for (r, &b) in self.basis.iter().enumerate() {
            let cb = cost[b];
            if cb != 0.0 {
                for (z, a) in reduced.iter_mut().zip(&self.tableau[r]) {
                    *z -= cb * a;
                }
            }
        }

        loop {
            let Some(entering) = (0..self.n_total).find(|&j| allowed[j] && reduced[j] < -eps)
            else {
                return PhaseEnd::Optimal;
            };

            let mut leaving: Option<(usize, f64)> = None;
            for r in 0..self.tableau.len() {
                let a = self.tableau[r][entering];
                if a <= eps {
                    continue;
                }
                let ratio = self.rhs[r] / a;
                leaving = match leaving {
                    None => Some((r, ratio)),
                    Some((best_row, best)) => {
                        let better = ratio < best - eps
                            || (ratio <= best + eps && self.basis[r] < self.basis[best_row]);
                        if better {
                            Some((r, ratio))
                        } else {
                            Some((best_row, best))
                        }
                    }
                };
            }
            let Some((row, _)) = leaving else {
                return PhaseEnd::Unbounded;
            };

            if *iterations >= max_iterations {
                return PhaseEnd::IterationLimit;
            }
            self.pivot(row, entering, eps);
            *iterations += 1;

            let factor = reduced[entering];
            for (z, a) in reduced.iter_mut().zip(&self.tableau[row]) {
                *z -= factor * a;
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize, eps: f64) {
        let p = self.tableau[row][col];
        for v in self.tableau[row].iter_mut() {
            *v /= p;
        }
        self.rhs[row] /= p;

        let pivot_row = self.tableau[row].clone();
        let pivot_rhs = self.rhs[row];
        for i in 0..self.tableau.len() {
            if i == row {
                continue;
            }
            let factor = self.tableau[i][col];
            if factor == 0.0 {
                continue;
            }
            for (v, a) in self.tableau[i].iter_mut().zip(&pivot_row) {
                *v -= factor * a;
            }
            self.rhs[i] -= factor * pivot_rhs;
            if self.rhs[i] < 0.0 && self.rhs[i] > -eps {
                self.rhs[i] = 0.0;
            }
        }
        self.basis[row] = col;
    }

    /// Replace zero-valued basic artificials with real columns where the row
    /// allows it. Rows with no such column are redundant and keep their
    /// artificial at zero.
    fn drive_out_artificials(&mut self, eps: f64) {
        for r in 0..self.tableau.len() {
            if !self.is_artificial(self.basis[r]) {
                continue;
            }
            self.rhs[r] = 0.0;
            let replacement =
                (0..self.first_artificial).find(|&j| self.tableau[r][j].abs() > eps);
            if let Some(col) = replacement {
                self.pivot(r, col, eps);
            }
        }
    }

    fn primal(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.n_total];
        for (r, &b) in self.basis.iter().enumerate() {
            values[b] = self.rhs[r];
        }
        self.mappings
            .iter()
            .map(|mapping| match *mapping {
                Mapping::Shifted { col, offset } => offset + values[col],
                Mapping::Mirrored { col, offset } => offset - values[col],
                Mapping::Split { pos, neg } => values[pos] - values[neg],
            })
            .collect()
    }

    /// Solve `Bᵀy = c_B` and map the standard-row duals back onto the
    /// problem's rows.
    fn row_duals(&self, num_rows: usize) -> Result<Vec<f64>, LpError> {
        let m = self.basis.len();
        let mut duals = vec![0.0; num_rows];
        if m == 0 {
            return Ok(duals);
        }

        let bt = Mat::from_fn(m, m, |k, r| self.matrix[r][self.basis[k]]);
        let cb = Mat::from_fn(m, 1, |k, _| self.phase2_cost[self.basis[k]]);
        let lu = PartialPivLu::new(bt.as_ref());
        let y = lu.solve(&cb);

        for r in 0..m {
            let value = y.read(r, 0);
            if !value.is_finite() {
                return Err(LpError::Numerical {
                    backend: "simplex".into(),
                    message: "singular basis while recovering duals".into(),
                });
            }
            if let Some(i) = self.origin[r] {
                duals[i] = if self.flipped[r] { -value } else { value };
            }
        }
        Ok(duals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{ColumnTag, LpStatus, RowTag};
    use nodal_core::Network;

    /// Network ids for tagging hand-written LPs.
    fn tags() -> (Vec<ColumnTag>, Vec<RowTag>) {
        let mut network = Network::new();
        let a = network.add_region("A", 0.0).unwrap();
        let b = network.add_region("B", 0.0).unwrap();
        let g1 = network.add_generator("A", "Coal", 1.0, 1.0).unwrap();
        let g2 = network.add_generator("A", "Gas", 1.0, 1.0).unwrap();
        let l = network.add_line("A-B", "A", "B", 1.0).unwrap();
        (
            vec![
                ColumnTag::Dispatch(g1),
                ColumnTag::Dispatch(g2),
                ColumnTag::Flow(l),
            ],
            vec![
                RowTag::Balance(a),
                RowTag::Balance(b),
                RowTag::GeneratorCapacity(g1),
            ],
        )
    }

    fn solve(lp: &LpProblem) -> LpOutcome {
        SimplexBackend.solve(lp, &SolverConfig::default()).unwrap()
    }

    #[test]
    fn test_textbook_maximization() {
        // max 3x + 5y  s.t. x ≤ 4, 2y ≤ 12, 3x + 2y ≤ 18  →  x = 2, y = 6
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, -3.0, cols[0]);
        let y = lp.add_column("y", 0.0, f64::INFINITY, -5.0, cols[1]);
        lp.add_row("c1", vec![(x, 1.0)], RowSense::LessEqual, 4.0, rows[0]);
        lp.add_row("c2", vec![(y, 2.0)], RowSense::LessEqual, 12.0, rows[1]);
        lp.add_row(
            "c3",
            vec![(x, 3.0), (y, 2.0)],
            RowSense::LessEqual,
            18.0,
            rows[2],
        );

        let LpOutcome::Optimal(sol) = solve(&lp) else {
            panic!("expected optimal");
        };
        assert!((sol.x[x] - 2.0).abs() < 1e-9, "x = {}", sol.x[x]);
        assert!((sol.x[y] - 6.0).abs() < 1e-9, "y = {}", sol.x[y]);
        assert!((sol.objective + 36.0).abs() < 1e-9);
        // Known duals of the maximization are (0, 1.5, 1); minimizing flips the sign.
        assert!(sol.row_duals[0].abs() < 1e-9);
        assert!((sol.row_duals[1] + 1.5).abs() < 1e-9);
        assert!((sol.row_duals[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_equality_with_bounded_free_column() {
        // min 2a  s.t. a − f = 3, −1 ≤ f ≤ 1  →  f = −1, a = 2
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let a = lp.add_column("a", 0.0, f64::INFINITY, 2.0, cols[0]);
        let f = lp.add_column("f", -1.0, 1.0, 0.0, cols[2]);
        lp.add_row(
            "bal",
            vec![(a, 1.0), (f, -1.0)],
            RowSense::Equal,
            3.0,
            rows[0],
        );

        let LpOutcome::Optimal(sol) = solve(&lp) else {
            panic!("expected optimal");
        };
        assert!((sol.x[a] - 2.0).abs() < 1e-9, "a = {}", sol.x[a]);
        assert!((sol.x[f] + 1.0).abs() < 1e-9, "f = {}", sol.x[f]);
        assert!((sol.row_duals[0] - 2.0).abs() < 1e-9);
        // f sits on its lower bound; raising it costs 2 per unit.
        assert!((sol.reduced_costs[f] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_rhs_and_ge_rows() {
        // min x + y  s.t. −x − y ≤ −5, x ≥ 1  →  objective 5, dual of row 0 is −1
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0, cols[0]);
        let y = lp.add_column("y", 0.0, f64::INFINITY, 1.0, cols[1]);
        lp.add_row(
            "cover",
            vec![(x, -1.0), (y, -1.0)],
            RowSense::LessEqual,
            -5.0,
            rows[0],
        );
        lp.add_row("floor", vec![(x, 1.0)], RowSense::GreaterEqual, 1.0, rows[1]);

        let LpOutcome::Optimal(sol) = solve(&lp) else {
            panic!("expected optimal");
        };
        assert!((sol.objective - 5.0).abs() < 1e-9);
        assert!(sol.x[x] >= 1.0 - 1e-9);
        assert!((sol.row_duals[0] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible() {
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, 2.0, 1.0, cols[0]);
        lp.add_row("need", vec![(x, 1.0)], RowSense::Equal, 5.0, rows[0]);

        assert_eq!(solve(&lp).status(), LpStatus::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, -1.0, cols[0]);
        let y = lp.add_column("y", 0.0, f64::INFINITY, 0.0, cols[1]);
        lp.add_row(
            "diff",
            vec![(x, 1.0), (y, -1.0)],
            RowSense::LessEqual,
            1.0,
            rows[0],
        );

        assert_eq!(solve(&lp).status(), LpStatus::Unbounded);
    }

    #[test]
    fn test_iteration_limit() {
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0, cols[0]);
        let y = lp.add_column("y", 0.0, f64::INFINITY, 2.0, cols[1]);
        lp.add_row("a", vec![(x, 1.0)], RowSense::Equal, 1.0, rows[0]);
        lp.add_row("b", vec![(y, 1.0)], RowSense::Equal, 1.0, rows[1]);

        let config = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let outcome = SimplexBackend.solve(&lp, &config).unwrap();
        assert_eq!(outcome.status(), LpStatus::IterationLimitExceeded);
        assert_eq!(outcome.iterations(), 1);
    }

    #[test]
    fn test_redundant_equality_rows() {
        // Same constraint twice; the second artificial cannot leave the basis.
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, 3.0, cols[0]);
        lp.add_row("a", vec![(x, 1.0)], RowSense::Equal, 2.0, rows[0]);
        lp.add_row("b", vec![(x, 1.0)], RowSense::Equal, 2.0, rows[1]);

        let LpOutcome::Optimal(sol) = solve(&lp) else {
            panic!("expected optimal");
        };
        assert!((sol.x[x] - 2.0).abs() < 1e-9);
        assert!((sol.row_duals[0] + sol.row_duals[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_rows_with_tiny_tolerance() {
        // Pivot threshold never drops below the floor, so the redundant
        // artificial is handled the same way in both phases.
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let x = lp.add_column("x", 0.0, f64::INFINITY, 1.0, cols[0]);
        let y = lp.add_column("y", 0.0, f64::INFINITY, 3.0, cols[1]);
        lp.add_row("a", vec![(x, 1.0), (y, 1.0)], RowSense::Equal, 2.0, rows[0]);
        lp.add_row("b", vec![(x, 1.0), (y, 1.0)], RowSense::Equal, 2.0, rows[1]);

        let config = SolverConfig {
            tolerance: 1e-18,
            ..SolverConfig::default()
        };
        let LpOutcome::Optimal(sol) = SimplexBackend.solve(&lp, &config).unwrap() else {
            panic!("expected optimal");
        };
        assert!((sol.x[x] - 2.0).abs() < 1e-9, "x = {}", sol.x[x]);
        assert!(sol.x[y].abs() < 1e-9, "y = {}", sol.x[y]);
        for row in lp.rows() {
            let lhs: f64 = row.coefficients.iter().map(|&(j, a)| a * sol.x[j]).sum();
            assert!((lhs - row.rhs).abs() < 1e-9, "{}: {} != {}", row.name, lhs, row.rhs);
        }
    }

    #[test]
    fn test_free_column_split() {
        let (cols, rows) = tags();
        let mut lp = LpProblem::new();
        let f = lp.add_column("f", f64::NEG_INFINITY, f64::INFINITY, 1.0, cols[2]);
        lp.add_row("floor", vec![(f, 1.0)], RowSense::GreaterEqual, -4.0, rows[0]);

        let LpOutcome::Optimal(sol) = solve(&lp) else {
            panic!("expected optimal");
        };
        assert!((sol.x[f] + 4.0).abs() < 1e-9, "f = {}", sol.x[f]);
        assert!((sol.row_duals[0] - 1.0).abs() < 1e-9);
    }
}
