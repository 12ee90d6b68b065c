//! CLI configuration file
//!
//! ```json
//! {"data_dir": "./data", "log_level": "warn", "max_documents": 100000}
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::Severity;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one `<collection>.json` file per collection
    pub data_dir: String,

    /// Minimum log severity (optional, default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest collection the CLI will load (optional, default 100000)
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_documents() -> usize {
    100_000
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            )));
        }

        if self.max_documents == 0 {
            return Err(CliError::config_error("max_documents must be > 0"));
        }

        Ok(())
    }

    /// Configured log severity; falls back to `Warn` if unparsable
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Warn)
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Path of a collection's data file
    pub fn collection_path(&self, collection: &str) -> CliResult<PathBuf> {
        let valid = !collection.is_empty()
            && collection != "."
            && collection != ".."
            && !collection.contains(['/', '\\']);
        if !valid {
            return Err(CliError::invalid_request(format!(
                "Invalid collection name: '{}'",
                collection
            )));
        }
        Ok(self.data_path().join(format!("{}.json", collection)))
    }

    /// Loads a collection's documents.
    ///
    /// A missing file is an empty collection. The file must hold a JSON array
    /// of at most `max_documents` entries.
    pub fn load_collection(&self, collection: &str) -> CliResult<Vec<Value>> {
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let documents: Vec<Value> = match serde_json::from_str(&content) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                return Err(CliError::data_error(format!(
                    "{} must contain a JSON array",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(CliError::data_error(format!(
                    "Invalid JSON in {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if documents.len() > self.max_documents {
            return Err(CliError::data_error(format!(
                "Collection '{}' has {} documents, more than max_documents ({})",
                collection,
                documents.len(),
                self.max_documents
            )));
        }

        Ok(documents)
    }
}
