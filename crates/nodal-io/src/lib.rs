//! # nodal-io: Case files for nodal economic dispatch
//!
//! Reads a dispatch case (regions, generators, lines and solver settings)
//! from TOML or JSON and declares it on a [`nodal_core::Network`].
//!
//! ## Layouts
//!
//! | Layout | Keys |
//! |--------|------|
//! | Structured | `[[regions]]`, `[[generators]]`, `[[lines]]` |
//! | Tabular | `loads.<region>`, `capacities.<region>.<tech>`, `marginal_costs.<region>.<tech>`, `lines.<name>` |
//!
//! Both accept `[[technologies]]` (CO₂ intensity per technology) and a
//! `[solver]` section; see [`case`] and [`settings`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use nodal_io::load_case;
//!
//! let mut case = load_case("cases/south_america.toml")?;
//! case.solver.apply_env()?;
//! println!("{} regions", case.network.num_regions());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod case;
pub mod error;
pub mod format;
pub mod loader;
pub mod settings;

pub use case::{Case, CaseFile, CaseLayout};
pub use error::CaseError;
pub use format::CaseFormat;
pub use loader::{load_case, parse_case, parse_case_auto, CaseReader, DEFAULT_MAX_CASE_SIZE};
pub use settings::{SolverSettings, ENV_MAX_ITERATIONS, ENV_SOLVER, ENV_TOLERANCE};
