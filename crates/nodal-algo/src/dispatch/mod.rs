//! Network-constrained economic dispatch.
//!
//! [`DispatchProblem`] walks one network through build → solve → extract and
//! refuses out-of-order calls: asking for a solution before solving is
//! [`DispatchError::NotSolved`], and a problem is solved at most once.
//! [`DispatchSolver`] wraps the whole sequence behind a builder:
//!
//! ```no_run
//! use nodal_algo::{BackendKind, DispatchSolver};
//! use nodal_core::Network;
//!
//! let mut network = Network::new();
//! network.add_region("A", 100.0)?;
//! network.add_generator("A", "Coal", 150.0, 10.0)?;
//!
//! let solution = DispatchSolver::new()
//!     .with_backend(BackendKind::Simplex)
//!     .solve(&network)?;
//! println!("price in A: {}", solution.shadow_price("A").unwrap());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod diagnose;
pub mod extract;

pub use builder::{build_lp, EntityIndex};
pub use diagnose::{diagnose_infeasibility, InfeasibilityReport};
pub use extract::{
    BindingConstraint, BindingKind, DispatchSolution, GeneratorDispatch, LineFlow, RegionResult,
    SolveMetadata,
};

use crate::lp::{BackendKind, LpBackend, LpError, LpOutcome, LpProblem, LpSolution, LpStatus, SolverConfig};
use nodal_core::{NodalError, Network};
use thiserror::Error;
use tracing::{info, warn};
use web_time::Instant;

/// Usage errors and non-optimal outcomes of a dispatch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("dispatch has not been solved")]
    NotSolved,

    #[error("dispatch problem was already solved; build a new one to solve again")]
    AlreadySolved,

    #[error("dispatch is infeasible: {}", .0.summary())]
    Infeasible(Box<InfeasibilityReport>),

    #[error("dispatch LP is unbounded")]
    Unbounded,

    #[error("iteration limit of {limit} reached after {iterations} iterations")]
    IterationLimitExceeded { limit: usize, iterations: usize },

    /// Malformed LP or backend failure
    #[error(transparent)]
    Lp(#[from] LpError),
}

impl DispatchError {
    /// Solver outcome this error stands for, if it is one.
    pub fn status(&self) -> Option<LpStatus> {
        match self {
            DispatchError::Infeasible(_) => Some(LpStatus::Infeasible),
            DispatchError::Unbounded => Some(LpStatus::Unbounded),
            DispatchError::IterationLimitExceeded { .. } => Some(LpStatus::IterationLimitExceeded),
            _ => None,
        }
    }
}

impl From<DispatchError> for NodalError {
    fn from(err: DispatchError) -> Self {
        NodalError::Solver(err.to_string())
    }
}

enum SolveState {
    Pending,
    Optimal {
        solution: LpSolution,
        metadata: SolveMetadata,
        tolerance: f64,
    },
    Infeasible(Box<InfeasibilityReport>),
    Unbounded,
    IterationLimitExceeded {
        limit: usize,
        iterations: usize,
    },
}

/// One network, its LP and the outcome of solving it.
pub struct DispatchProblem<'a> {
    network: &'a Network,
    lp: LpProblem,
    index: EntityIndex,
    state: SolveState,
}

impl<'a> DispatchProblem<'a> {
    /// Build the LP for `network`.
    pub fn new(network: &'a Network) -> Self {
        let (lp, index) = build_lp(network);
        Self {
            network,
            lp,
            index,
            state: SolveState::Pending,
        }
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn lp(&self) -> &LpProblem {
        &self.lp
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    /// `None` until solved.
    pub fn status(&self) -> Option<LpStatus> {
        match self.state {
            SolveState::Pending => None,
            SolveState::Optimal { .. } => Some(LpStatus::Optimal),
            SolveState::Infeasible(_) => Some(LpStatus::Infeasible),
            SolveState::Unbounded => Some(LpStatus::Unbounded),
            SolveState::IterationLimitExceeded { .. } => Some(LpStatus::IterationLimitExceeded),
        }
    }

    /// Solve with `backend`. Non-optimal outcomes are recorded and returned
    /// as a status; only backend malfunctions are errors.
    pub fn solve(
        &mut self,
        backend: &dyn LpBackend,
        config: &SolverConfig,
    ) -> Result<LpStatus, DispatchError> {
        if !matches!(self.state, SolveState::Pending) {
            return Err(DispatchError::AlreadySolved);
        }

        let start = Instant::now();
        let outcome = backend.solve(&self.lp, config)?;
        let elapsed = start.elapsed();
        let status = outcome.status();

        self.state = match outcome {
            LpOutcome::Optimal(solution) => {
                info!(
                    backend = backend.id(),
                    objective = solution.objective,
                    iterations = solution.iterations,
                    "dispatch solved"
                );
                SolveState::Optimal {
                    metadata: SolveMetadata {
                        backend: backend.id().to_string(),
                        iterations: solution.iterations,
                        solve_time_ms: elapsed.as_millis(),
                    },
                    solution,
                    tolerance: config.tolerance,
                }
            }
            LpOutcome::Infeasible { .. } => {
                let report = diagnose_infeasibility(self.network, &self.lp, &self.index);
                warn!(backend = backend.id(), reason = %report.summary(), "dispatch infeasible");
                SolveState::Infeasible(Box::new(report))
            }
            LpOutcome::Unbounded { .. } => {
                warn!(backend = backend.id(), "dispatch unbounded");
                SolveState::Unbounded
            }
            LpOutcome::IterationLimitExceeded { iterations } => {
                warn!(
                    backend = backend.id(),
                    iterations,
                    limit = config.max_iterations,
                    "dispatch hit the iteration limit"
                );
                SolveState::IterationLimitExceeded {
                    limit: config.max_iterations,
                    iterations,
                }
            }
        };
        Ok(status)
    }

    /// Results of a successful solve.
    pub fn solution(&self) -> Result<DispatchSolution, DispatchError> {
        match &self.state {
            SolveState::Pending => Err(DispatchError::NotSolved),
            SolveState::Optimal {
                solution,
                metadata,
                tolerance,
            } => Ok(extract::extract(
                self.network,
                &self.lp,
                &self.index,
                solution,
                metadata.clone(),
                *tolerance,
            )),
            SolveState::Infeasible(report) => Err(DispatchError::Infeasible(report.clone())),
            SolveState::Unbounded => Err(DispatchError::Unbounded),
            SolveState::IterationLimitExceeded { limit, iterations } => {
                Err(DispatchError::IterationLimitExceeded {
                    limit: *limit,
                    iterations: *iterations,
                })
            }
        }
    }
}

/// Builder-style front end: pick a backend and settings, then solve networks.
#[derive(Debug, Clone, Default)]
pub struct DispatchSolver {
    backend: BackendKind,
    config: SolverConfig,
}

impl DispatchSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Build, solve and extract in one step.
    pub fn solve(&self, network: &Network) -> Result<DispatchSolution, DispatchError> {
        let backend = self.backend.create()?;
        let mut problem = DispatchProblem::new(network);
        problem.solve(backend.as_ref(), &self.config)?;
        problem.solution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::SimplexBackend;

    fn small() -> Network {
        let mut network = Network::new();
        network.add_region("A", 10.0).unwrap();
        network.add_generator("A", "Gas", 20.0, 30.0).unwrap();
        network
    }

    #[test]
    fn test_solution_before_solve_is_not_solved() {
        let network = small();
        let problem = DispatchProblem::new(&network);
        assert!(problem.status().is_none());
        assert!(matches!(problem.solution(), Err(DispatchError::NotSolved)));
    }

    #[test]
    fn test_second_solve_is_rejected() {
        let network = small();
        let mut problem = DispatchProblem::new(&network);
        let status = problem
            .solve(&SimplexBackend, &SolverConfig::default())
            .unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!(matches!(
            problem.solve(&SimplexBackend, &SolverConfig::default()),
            Err(DispatchError::AlreadySolved)
        ));
        // The first result is still available.
        let solution = problem.solution().unwrap();
        assert_eq!(solution.metadata.backend, "simplex");
        assert!((solution.objective().value() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_solution_carries_report() {
        let mut network = small();
        network.add_region("B", 5.0).unwrap();
        let mut problem = DispatchProblem::new(&network);
        let status = problem
            .solve(&SimplexBackend, &SolverConfig::default())
            .unwrap();
        assert_eq!(status, LpStatus::Infeasible);

        match problem.solution() {
            Err(DispatchError::Infeasible(report)) => {
                assert!(report.conflicting.contains(&"balance(B)".to_string()));
            }
            other => panic!("expected infeasible, got {:?}", other.map(|s| s.objective)),
        }
    }

    #[test]
    fn test_solver_builder() {
        let solver = DispatchSolver::new()
            .with_backend(BackendKind::Simplex)
            .with_max_iterations(50)
            .with_tolerance(1e-8);
        assert_eq!(solver.backend(), BackendKind::Simplex);
        assert_eq!(solver.config().max_iterations, 50);
        assert_eq!(solver.config().tolerance, 1e-8);
    }

    #[test]
    fn test_dispatch_error_status() {
        assert_eq!(DispatchError::Unbounded.status(), Some(LpStatus::Unbounded));
        assert_eq!(DispatchError::NotSolved.status(), None);
        let err: NodalError = DispatchError::Unbounded.into();
        assert!(err.to_string().contains("unbounded"));
    }
}
