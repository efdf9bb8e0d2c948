//! Error types for the nodal workspace.
//!
//! [`NetworkError`] covers everything that can go wrong while declaring a
//! network. Every variant is raised at the point of declaration; a failed
//! `add_*` call leaves the [`Network`](crate::Network) untouched.
//!
//! [`NodalError`] is the unified error used at API boundaries so that errors
//! from model construction, case parsing and solving can be handled with a
//! single `?`.
//!
//! ```ignore
//! use nodal_core::{NodalError, NodalResult};
//!
//! fn run(path: &str) -> NodalResult<()> {
//!     let network = load_case(path)?;
//!     solve_dispatch(&network)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Kind of entity named in a [`NetworkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Region,
    Generator,
    Line,
    Technology,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Region => write!(f, "region"),
            EntityKind::Generator => write!(f, "generator"),
            EntityKind::Line => write!(f, "line"),
            EntityKind::Technology => write!(f, "technology"),
        }
    }
}

/// Model-construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("duplicate {kind} '{id}'")]
    DuplicateEntity { kind: EntityKind, id: String },

    #[error("{kind} '{entity}' references unknown region '{region}'")]
    UnknownRegion {
        kind: EntityKind,
        entity: String,
        region: String,
    },

    #[error("{kind} '{entity}' has negative capacity {value} MW")]
    NegativeCapacity {
        kind: EntityKind,
        entity: String,
        value: f64,
    },

    #[error("region '{region}' has negative demand {value} MW")]
    NegativeDemand { region: String, value: f64 },

    #[error("technology '{technology}' has negative emission intensity {value} t/MWh")]
    NegativeEmissionIntensity { technology: String, value: f64 },

    #[error("{field} of {kind} '{entity}' is not a finite number")]
    NonFinite {
        kind: EntityKind,
        entity: String,
        field: &'static str,
    },

    #[error("line '{line}' connects region '{region}' to itself")]
    SelfLoop { line: String, region: String },

    #[error("no marginal cost defined for technology '{technology}' in region '{region}'")]
    MissingMarginalCost { region: String, technology: String },
}

/// Unified error type for all nodal operations.
#[derive(Error, Debug)]
pub enum NodalError {
    /// I/O errors (case files, output files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Case file parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network declaration errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Solver errors and non-optimal outcomes
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for results using [`NodalError`].
pub type NodalResult<T> = Result<T, NodalError>;

impl From<anyhow::Error> for NodalError {
    fn from(err: anyhow::Error) -> Self {
        NodalError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for NodalError {
    fn from(err: serde_json::Error) -> Self {
        NodalError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::UnknownRegion {
            kind: EntityKind::Line,
            entity: "BR-AR".into(),
            region: "Argentina".into(),
        };
        assert_eq!(
            err.to_string(),
            "line 'BR-AR' references unknown region 'Argentina'"
        );
    }

    #[test]
    fn test_network_error_converts_to_nodal_error() {
        fn inner() -> NodalResult<()> {
            Err(NetworkError::NegativeDemand {
                region: "BO".into(),
                value: -1.0,
            })?;
            Ok(())
        }

        let err = inner().unwrap_err();
        assert!(matches!(err, NodalError::Network(_)));
        assert!(err.to_string().contains("negative demand"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "case not found");
        let err: NodalError = io_err.into();
        assert!(matches!(err, NodalError::Io(_)));
    }
}
