//! Case file format detection.

use std::path::Path;

use crate::error::CaseError;

/// Supported case file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Toml,
    Json,
}

impl CaseFormat {
    pub const ALL: &'static [CaseFormat] = &[CaseFormat::Toml, CaseFormat::Json];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CaseFormat::Toml => &["toml"],
            CaseFormat::Json => &["json"],
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            CaseFormat::Toml => "TOML case",
            CaseFormat::Json => "JSON case",
        }
    }

    /// Every accepted extension, comma separated.
    pub fn allowed_extensions() -> String {
        Self::ALL
            .iter()
            .flat_map(|f| f.extensions().iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Detect the format from the file extension.
    pub fn detect(path: &Path) -> Result<CaseFormat, CaseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .ok_or_else(|| CaseError::UnsupportedExtension {
                extension: ext,
                allowed: Self::allowed_extensions(),
            })
    }

    /// Guess the format of in-memory text: a JSON document starts with `{`.
    pub fn sniff(content: &str) -> CaseFormat {
        if content.trim_start().starts_with('{') {
            CaseFormat::Json
        } else {
            CaseFormat::Toml
        }
    }
}

impl std::fmt::Display for CaseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

impl std::str::FromStr for CaseFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(CaseFormat::Toml),
            "json" => Ok(CaseFormat::Json),
            _ => anyhow::bail!("Unknown case format: {}. Supported: toml, json", s),
        }
    }
}
