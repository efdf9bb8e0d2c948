//! Errors raised while reading a case file.

use nodal_core::{NetworkError, NodalError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("case file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported case file extension '{extension}' (expected one of: {allowed})")]
    UnsupportedExtension { extension: String, allowed: String },

    #[error("case file size {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Keys from both the structured and the tabular layout
    #[error("case mixes structured keys ({structured}) with tabular keys ({tabular})")]
    MixedLayout { structured: String, tabular: String },

    #[error("case declares no regions")]
    Empty,

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl From<CaseError> for NodalError {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::Network(e) => NodalError::Network(e),
            CaseError::InvalidSetting { .. } => NodalError::Config(err.to_string()),
            other => NodalError::Parse(other.to_string()),
        }
    }
}
