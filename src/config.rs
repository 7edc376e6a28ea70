//! Planner configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of genes per batch
pub const DEFAULT_BATCH_SIZE: usize = 5000;
/// Default largest gene restriction aggregated in a single pass
pub const DEFAULT_SINGLE_PASS_GENE_LIMIT: usize = 5000;

/// Errors raised while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Genes per batch when aggregation over the candidate population
    /// is split
    pub batch_size: usize,

    /// Largest caller-supplied gene restriction still aggregated in one
    /// physical execution
    pub single_pass_gene_limit: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            single_pass_gene_limit: DEFAULT_SINGLE_PASS_GENE_LIMIT,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_single_pass_gene_limit(mut self, limit: usize) -> Self {
        self.single_pass_gene_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.single_pass_gene_limit, 5000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlannerConfig::from_json(r#"{"batch_size": 2}"#).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.single_pass_gene_limit, DEFAULT_SINGLE_PASS_GENE_LIMIT);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = PlannerConfig::from_json(r#"{"batch_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PlannerConfig::from_json(r#"{"batch": 10}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"batch_size": 10, "single_pass_gene_limit": 3}}"#).unwrap();

        let config = PlannerConfig::load(file.path()).unwrap();
        assert_eq!(config, PlannerConfig::default().with_batch_size(10).with_single_pass_gene_limit(3));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlannerConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
