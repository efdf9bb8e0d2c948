//! Linear programs and the backends that solve them.
//!
//! An [`LpProblem`] is
//!
//! ```text
//! minimize    c·x
//! subject to  a_i·x {≤, =, ≥} b_i        (rows)
//!             lower_j ≤ x_j ≤ upper_j     (column bounds)
//! ```
//!
//! Every column and row carries a tag naming the network entity it was built
//! from, so solved values map back onto regions, generators and lines without
//! positional bookkeeping.
//!
//! Backends implement [`LpBackend`]. Optimality, infeasibility, unboundedness
//! and iteration exhaustion are *outcomes* ([`LpOutcome`]); [`LpError`] is
//! reserved for malformed problems and numerical breakdown.
//!
//! ## Dual sign convention
//!
//! Every backend reports row duals as the sensitivity of the optimal objective
//! to the row's right-hand side: `y_i = ∂z*/∂b_i`. Reduced costs are
//! `d_j = c_j − Σ_i y_i a_ij`. A binding `≤` row in a minimization therefore
//! has `y_i ≤ 0`, and a column resting on its upper bound has `d_j ≤ 0`.

#[cfg(feature = "solver-clarabel")]
mod conic;
mod format;
mod simplex;

#[cfg(feature = "solver-clarabel")]
pub use conic::ClarabelBackend;
pub use format::{sanitize_name, write_lp};
pub use simplex::SimplexBackend;

use nodal_core::{GeneratorId, LineId, RegionId};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Relation between a row's activity and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSense {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl RowSense {
    pub fn symbol(&self) -> &'static str {
        match self {
            RowSense::LessEqual => "<=",
            RowSense::Equal => "=",
            RowSense::GreaterEqual => ">=",
        }
    }
}

/// Network entity a column was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ColumnTag {
    /// Output of a generator
    Dispatch(GeneratorId),
    /// Signed flow on a line
    Flow(LineId),
}

/// Network entity a row was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RowTag {
    /// Supply/demand balance of a region
    Balance(RegionId),
    /// `g ≤ capacity` for a generator
    GeneratorCapacity(GeneratorId),
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    /// Objective coefficient
    pub cost: f64,
    pub tag: ColumnTag,
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub name: String,
    /// Sparse coefficients as (column index, value)
    pub coefficients: Vec<(usize, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
    pub tag: RowTag,
}

/// A minimization LP with tagged columns and rows.
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column and return its index.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        cost: f64,
        tag: ColumnTag,
    ) -> usize {
        self.columns.push(Column {
            name: name.into(),
            lower,
            upper,
            cost,
            tag,
        });
        self.columns.len() - 1
    }

    /// Append a row and return its index.
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        coefficients: Vec<(usize, f64)>,
        sense: RowSense,
        rhs: f64,
        tag: RowTag,
    ) -> usize {
        self.rows.push(Row {
            name: name.into(),
            coefficients,
            sense,
            rhs,
            tag,
        });
        self.rows.len() - 1
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn row(&self, index: usize) -> &Row {
        &self.rows[index]
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn objective(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.cost).collect()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.columns.iter().zip(x).map(|(c, v)| c.cost * v).sum()
    }

    /// Left-hand side `a_i·x` of a row.
    pub fn row_activity(&self, row: usize, x: &[f64]) -> f64 {
        self.rows[row]
            .coefficients
            .iter()
            .map(|&(j, a)| a * x[j])
            .sum()
    }

    /// Row-major sparse constraint matrix (rows × columns). Repeated
    /// (row, column) entries are summed.
    pub fn constraint_matrix(&self) -> CsMat<f64> {
        let mut triplets = TriMat::new((self.rows.len(), self.columns.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, a) in &row.coefficients {
                triplets.add_triplet(i, j, a);
            }
        }
        triplets.to_csr()
    }

    /// `d_j = c_j − Σ_i y_i a_ij` for the given row duals.
    pub fn reduced_costs(&self, row_duals: &[f64]) -> Vec<f64> {
        let mut reduced = self.objective();
        for (row, &y) in self.rows.iter().zip(row_duals) {
            for &(j, a) in &row.coefficients {
                reduced[j] -= y * a;
            }
        }
        reduced
    }

    /// Largest finite magnitude among costs, coefficients, bounds and
    /// right-hand sides; at least 1. Used to scale solver tolerances.
    pub fn magnitude(&self) -> f64 {
        let columns = self.columns.iter().flat_map(|c| [c.cost, c.lower, c.upper]);
        let rows = self
            .rows
            .iter()
            .flat_map(|r| r.coefficients.iter().map(|&(_, a)| a).chain([r.rhs]));
        columns
            .chain(rows)
            .filter(|v| v.is_finite())
            .fold(1.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Scale of primal values: largest finite bound or right-hand side; at
    /// least 1.
    pub fn primal_magnitude(&self) -> f64 {
        let bounds = self.columns.iter().flat_map(|c| [c.lower, c.upper]);
        bounds
            .chain(self.rows.iter().map(|r| r.rhs))
            .filter(|v| v.is_finite())
            .fold(1.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Scale of duals and reduced costs: largest absolute cost; at least 1.
    pub fn cost_magnitude(&self) -> f64 {
        self.columns
            .iter()
            .map(|c| c.cost)
            .filter(|v| v.is_finite())
            .fold(1.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Check indices, bounds and numbers before handing the problem to a
    /// backend.
    pub fn validate(&self) -> Result<(), LpError> {
        for column in &self.columns {
            if !column.cost.is_finite() || column.lower.is_nan() || column.upper.is_nan() {
                return Err(LpError::NonFinite(format!("column '{}'", column.name)));
            }
            if column.lower == f64::INFINITY || column.upper == f64::NEG_INFINITY {
                return Err(LpError::NonFinite(format!("bounds of column '{}'", column.name)));
            }
            if column.lower > column.upper {
                return Err(LpError::InvalidBounds {
                    column: column.name.clone(),
                    lower: column.lower,
                    upper: column.upper,
                });
            }
        }
        for row in &self.rows {
            if !row.rhs.is_finite() {
                return Err(LpError::NonFinite(format!("right-hand side of row '{}'", row.name)));
            }
            for &(j, a) in &row.coefficients {
                if j >= self.columns.len() {
                    return Err(LpError::ColumnOutOfRange {
                        row: row.name.clone(),
                        column: j,
                        columns: self.columns.len(),
                    });
                }
                if !a.is_finite() {
                    return Err(LpError::NonFinite(format!("coefficient of row '{}'", row.name)));
                }
            }
        }
        Ok(())
    }

    /// Re-derive the network entities present in this problem from its tags.
    pub fn structure(&self) -> LpStructure {
        let mut structure = LpStructure::default();
        for column in &self.columns {
            let fresh = match column.tag {
                ColumnTag::Dispatch(g) => structure.generators.insert(g),
                ColumnTag::Flow(l) => structure.lines.insert(l),
            };
            if !fresh {
                structure.duplicate_tags += 1;
            }
        }
        for row in &self.rows {
            let fresh = match row.tag {
                RowTag::Balance(r) => structure.regions.insert(r),
                RowTag::GeneratorCapacity(g) => structure.capacity_limits.insert(g),
            };
            if !fresh {
                structure.duplicate_tags += 1;
            }
        }
        structure
    }
}

/// Entity sets recovered from an [`LpProblem`]'s tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LpStructure {
    /// Generators with a dispatch column
    pub generators: BTreeSet<GeneratorId>,
    /// Lines with a flow column
    pub lines: BTreeSet<LineId>,
    /// Regions with a balance row
    pub regions: BTreeSet<RegionId>,
    /// Generators with a capacity row
    pub capacity_limits: BTreeSet<GeneratorId>,
    /// Tags seen more than once
    pub duplicate_tags: usize,
}

/// Primal and dual values at an optimum.
#[derive(Debug, Clone, Serialize)]
pub struct LpSolution {
    pub x: Vec<f64>,
    /// `∂z*/∂b_i` per row
    pub row_duals: Vec<f64>,
    pub reduced_costs: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// Terminal state of a solve.
#[derive(Debug, Clone)]
pub enum LpOutcome {
    Optimal(LpSolution),
    Infeasible { iterations: usize },
    Unbounded { iterations: usize },
    IterationLimitExceeded { iterations: usize },
}

impl LpOutcome {
    pub fn status(&self) -> LpStatus {
        match self {
            LpOutcome::Optimal(_) => LpStatus::Optimal,
            LpOutcome::Infeasible { .. } => LpStatus::Infeasible,
            LpOutcome::Unbounded { .. } => LpStatus::Unbounded,
            LpOutcome::IterationLimitExceeded { .. } => LpStatus::IterationLimitExceeded,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            LpOutcome::Optimal(solution) => solution.iterations,
            LpOutcome::Infeasible { iterations }
            | LpOutcome::Unbounded { iterations }
            | LpOutcome::IterationLimitExceeded { iterations } => *iterations,
        }
    }
}

/// Outcome without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimitExceeded,
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LpStatus::Optimal => write!(f, "optimal"),
            LpStatus::Infeasible => write!(f, "infeasible"),
            LpStatus::Unbounded => write!(f, "unbounded"),
            LpStatus::IterationLimitExceeded => write!(f, "iteration limit exceeded"),
        }
    }
}

/// Malformed problems and backend failures. Never used for infeasible or
/// unbounded problems.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LpError {
    #[error("row '{row}' references column {column} but the problem has {columns} columns")]
    ColumnOutOfRange {
        row: String,
        column: usize,
        columns: usize,
    },

    #[error("column '{column}' has lower bound {lower} above upper bound {upper}")]
    InvalidBounds { column: String, lower: f64, upper: f64 },

    #[error("non-finite value in {0}")]
    NonFinite(String),

    #[error("unknown LP backend '{0}' (expected 'simplex' or 'clarabel')")]
    UnknownBackend(String),

    #[error("LP backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    #[error("{backend} numerical failure: {message}")]
    Numerical { backend: String, message: String },
}

/// Settings shared by all backends.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Pivot cap (simplex) or interior-point iteration cap (Clarabel)
    pub max_iterations: usize,
    /// Zero tolerance, scaled by the problem's magnitude
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
        }
    }
}

/// A linear programming backend.
pub trait LpBackend: Send + Sync {
    /// Short identifier ("simplex", "clarabel").
    fn id(&self) -> &str;

    fn solve(&self, problem: &LpProblem, config: &SolverConfig) -> Result<LpOutcome, LpError>;
}

/// Selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Simplex,
    Clarabel,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Simplex => "simplex",
            BackendKind::Clarabel => "clarabel",
        }
    }

    /// Whether this backend was compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Simplex => true,
            BackendKind::Clarabel => cfg!(feature = "solver-clarabel"),
        }
    }

    /// Instantiate the backend.
    pub fn create(&self) -> Result<Box<dyn LpBackend>, LpError> {
        match self {
            BackendKind::Simplex => Ok(Box::new(SimplexBackend)),
            #[cfg(feature = "solver-clarabel")]
            BackendKind::Clarabel => Ok(Box::new(ClarabelBackend)),
            #[cfg(not(feature = "solver-clarabel"))]
            BackendKind::Clarabel => Err(LpError::BackendUnavailable(self.as_str().to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = LpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simplex" => Ok(BackendKind::Simplex),
            "clarabel" => Ok(BackendKind::Clarabel),
            _ => Err(LpError::UnknownBackend(s.to_string())),
        }
    }
}
