//! # nodal-algo: Economic dispatch with shadow prices
//!
//! Turns a [`nodal_core::Network`] into a linear program, solves it and maps
//! the primal and dual values back onto regions, generators and lines.
//!
//! ## Pipeline
//!
//! | Stage | Item | Output |
//! |-------|------|--------|
//! | LP builder | [`build_lp`] | [`LpProblem`] + [`EntityIndex`] |
//! | LP solver | [`LpBackend`] | [`LpOutcome`] |
//! | Result extractor | [`DispatchProblem::solution`] | [`DispatchSolution`] |
//!
//! Each stage only consumes the previous stage's output.
//!
//! ### Backends
//!
//! | Backend | Feature | Method |
//! |---------|---------|--------|
//! | [`SimplexBackend`] | always | Dense two-phase simplex, Bland's rule |
//! | `ClarabelBackend` | `solver-clarabel` (default) | Interior point (Clarabel) |
//!
//! Both report duals with the same convention (`∂objective/∂rhs`), so a
//! region's shadow price is the dual of its balance row whichever backend
//! produced it.
//!
//! ## Example
//!
//! ```
//! use nodal_algo::DispatchSolver;
//! use nodal_core::Network;
//!
//! let mut network = Network::new();
//! network.add_region("A", 100.0)?;
//! network.add_region("B", 50.0)?;
//! network.add_generator("A", "Coal", 150.0, 10.0)?;
//! network.add_generator("B", "Hydro", 30.0, 5.0)?;
//! network.add_line("A-B", "A", "B", 40.0)?;
//!
//! let solution = DispatchSolver::new().solve(&network)?;
//! assert!((solution.objective().value() - 1350.0).abs() < 1e-6);
//! assert!((solution.flow("A-B").unwrap().value() - 20.0).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dispatch;
pub mod lp;

pub use dispatch::{
    build_lp, diagnose_infeasibility, BindingConstraint, BindingKind, DispatchError,
    DispatchProblem, DispatchSolution, DispatchSolver, EntityIndex, GeneratorDispatch,
    InfeasibilityReport, LineFlow, RegionResult, SolveMetadata,
};
#[cfg(feature = "solver-clarabel")]
pub use lp::ClarabelBackend;
pub use lp::{
    write_lp, BackendKind, ColumnTag, LpBackend, LpError, LpOutcome, LpProblem, LpSolution,
    LpStatus, LpStructure, RowSense, RowTag, SimplexBackend, SolverConfig,
};
