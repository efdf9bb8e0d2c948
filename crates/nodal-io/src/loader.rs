//! Reading case files from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::case::{Case, CaseFile};
use crate::error::CaseError;
use crate::format::CaseFormat;

/// Default maximum case file size (16 MB)
pub const DEFAULT_MAX_CASE_SIZE: u64 = 16 * 1024 * 1024;

/// Case file reader with a size limit.
#[derive(Debug, Clone)]
pub struct CaseReader {
    max_file_size: u64,
}

impl Default for CaseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseReader {
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_CASE_SIZE,
        }
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Read, parse and declare the case at `path`.
    ///
    /// Errors carry the path as context; the underlying [`CaseError`] is
    /// still reachable with `downcast_ref`.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Case> {
        let path = path.as_ref();
        let case = self
            .read_typed(path)
            .with_context(|| format!("loading case '{}'", path.display()))?;
        info!(
            path = %path.display(),
            layout = %case.layout,
            regions = case.network.num_regions(),
            generators = case.network.generators().len(),
            lines = case.network.num_lines(),
            "loaded case"
        );
        Ok(case)
    }

    fn read_typed(&self, path: &Path) -> Result<Case, CaseError> {
        let format = CaseFormat::detect(path)?;
        let metadata = fs::metadata(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CaseError::NotFound(path.to_path_buf())
            } else {
                CaseError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        if metadata.len() > self.max_file_size {
            return Err(CaseError::FileTooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }
        let content = fs::read_to_string(path).map_err(|source| CaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), format = %format, bytes = content.len(), "read case file");
        parse_case(&content, format)
    }
}

/// Load a case file with the default reader.
pub fn load_case(path: impl AsRef<Path>) -> Result<Case> {
    CaseReader::new().read(path)
}

/// Parse case text in a known format.
pub fn parse_case(content: &str, format: CaseFormat) -> Result<Case, CaseError> {
    let file: CaseFile = match format {
        CaseFormat::Toml => toml::from_str(content)?,
        CaseFormat::Json => serde_json::from_str(content)?,
    };
    file.into_case()
}

/// Parse case text, guessing the format from its first character.
pub fn parse_case_auto(content: &str) -> Result<Case, CaseError> {
    parse_case(content, CaseFormat::sniff(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_auto_json() {
        let case = parse_case_auto(
            r#"{"loads": {"A": 5}, "capacities": {"A": {"Gas": 10}}, "marginal_costs": {"A": {"Gas": 20}}}"#,
        )
        .unwrap();
        assert_eq!(case.network.generators().len(), 1);
    }

    #[test]
    fn test_parse_case_auto_toml() {
        let case = parse_case_auto("[loads]\nA = 5\n").unwrap();
        assert_eq!(case.network.num_regions(), 1);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_case("{\"regions\": [", CaseFormat::Json),
            Err(CaseError::Json(_))
        ));
    }
}
