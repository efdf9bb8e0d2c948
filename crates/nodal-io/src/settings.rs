//! Solver settings: the `[solver]` section of a case file.
//!
//! Settings are layered. The case file provides the base values (or the
//! defaults below), [`SolverSettings::apply_env`] overlays the `NODAL_*`
//! environment variables, and the CLI applies its flags last.
//!
//! ```toml
//! [solver]
//! backend = "clarabel"
//! max_iterations = 500
//! tolerance = 1e-8
//! ```

use nodal_algo::{BackendKind, SolverConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CaseError;

pub const ENV_SOLVER: &str = "NODAL_SOLVER";
pub const ENV_MAX_ITERATIONS: &str = "NODAL_MAX_ITERATIONS";
pub const ENV_TOLERANCE: &str = "NODAL_TOLERANCE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverSettings {
    /// LP backend (`simplex` or `clarabel`)
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Zero tolerance, scaled by the LP's magnitude
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_max_iterations() -> usize {
    SolverConfig::default().max_iterations
}

fn default_tolerance() -> f64 {
    SolverConfig::default().tolerance
}

impl SolverSettings {
    /// Overlay `NODAL_SOLVER`, `NODAL_MAX_ITERATIONS` and `NODAL_TOLERANCE`.
    pub fn apply_env(&mut self) -> Result<(), CaseError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CaseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SOLVER) {
            self.backend = value.trim().parse().map_err(|_| CaseError::InvalidSetting {
                key: ENV_SOLVER.to_string(),
                value: value.clone(),
                reason: "expected 'simplex' or 'clarabel'".to_string(),
            })?;
            debug!(backend = %self.backend, "solver backend from environment");
        }
        if let Some(value) = lookup(ENV_MAX_ITERATIONS) {
            self.max_iterations =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| CaseError::InvalidSetting {
                        key: ENV_MAX_ITERATIONS.to_string(),
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
            debug!(max_iterations = self.max_iterations, "iteration limit from environment");
        }
        if let Some(value) = lookup(ENV_TOLERANCE) {
            self.tolerance =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseFloatError| CaseError::InvalidSetting {
                        key: ENV_TOLERANCE.to_string(),
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
            debug!(tolerance = self.tolerance, "tolerance from environment");
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), CaseError> {
        if self.max_iterations == 0 {
            return Err(CaseError::InvalidSetting {
                key: "max_iterations".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(CaseError::InvalidSetting {
                key: "tolerance".to_string(),
                value: self.tolerance.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        Ok(())
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_solver_config() {
        let settings = SolverSettings::default();
        assert_eq!(settings.backend, BackendKind::Simplex);
        assert_eq!(settings.max_iterations, 10_000);
        assert_eq!(settings.tolerance, 1e-9);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let settings: SolverSettings = toml::from_str("backend = \"clarabel\"").unwrap();
        assert_eq!(settings.backend, BackendKind::Clarabel);
        assert_eq!(settings.max_iterations, 10_000);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<SolverSettings>("time_limit = 5").is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut settings = SolverSettings {
            backend: BackendKind::Clarabel,
            max_iterations: 50,
            tolerance: 1e-6,
        };
        settings
            .apply_overrides(env(&[
                (ENV_SOLVER, "Simplex"),
                (ENV_MAX_ITERATIONS, "200"),
                (ENV_TOLERANCE, "1e-7"),
            ]))
            .unwrap();
        assert_eq!(settings.backend, BackendKind::Simplex);
        assert_eq!(settings.max_iterations, 200);
        assert_eq!(settings.tolerance, 1e-7);
    }

    #[test]
    fn test_absent_env_keeps_values() {
        let mut settings = SolverSettings::default();
        settings.max_iterations = 42;
        settings.apply_overrides(env(&[])).unwrap();
        assert_eq!(settings.max_iterations, 42);
    }

    #[test]
    fn test_bad_env_values() {
        let mut settings = SolverSettings::default();
        let err = settings
            .apply_overrides(env(&[(ENV_SOLVER, "highs")]))
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidSetting { ref key, .. } if key == ENV_SOLVER));

        let err = settings
            .apply_overrides(env(&[(ENV_TOLERANCE, "-1")]))
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidSetting { ref key, .. } if key == "tolerance"));

        let err = settings
            .apply_overrides(env(&[(ENV_MAX_ITERATIONS, "many")]))
            .unwrap_err();
        assert!(
            matches!(err, CaseError::InvalidSetting { ref key, .. } if key == ENV_MAX_ITERATIONS)
        );
    }

    #[test]
    fn test_solver_config() {
        let settings = SolverSettings {
            backend: BackendKind::Simplex,
            max_iterations: 7,
            tolerance: 1e-5,
        };
        let config = settings.solver_config();
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.tolerance, 1e-5);
    }
}
