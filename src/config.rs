//! Category configuration loading.
//!
//! Watch mode is driven by a YAML configuration file mapping category names
//! to the file extensions they collect:
//!
//! ```yaml
//! categories:
//!   Documents: [".txt", ".pdf", ".docx"]
//!   Images: [".jpg", ".png", ".gif"]
//! ```
//!
//! A missing file, unparsable YAML, or an empty `categories` mapping is a
//! fatal startup condition for watch mode: without rules there is nothing
//! to organize.

use crate::category::CategoryRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading the category configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid YAML syntax or structure.
    ConfigInvalid(String),
    /// The `categories` mapping is missing or empty.
    NoCategories,
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::NoCategories => {
                write!(f, "Configuration defines no categories; nothing to organize")
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration file shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Category name -> extensions collected by that category.
    pub categories: BTreeMap<String, Vec<String>>,
}

impl WatchConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file does not exist,
    /// `ConfigError::ConfigInvalid` if YAML parsing fails, and
    /// `ConfigError::NoCategories` if the mapping is empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: WatchConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can actually drive an organize run.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() || self.categories.values().all(|exts| exts.is_empty()) {
            return Err(ConfigError::NoCategories);
        }
        Ok(())
    }

    /// Compiles the configuration into matching rules.
    ///
    /// Normalization and duplicate-extension warnings happen here; see
    /// [`CategoryRules::new`].
    pub fn compile(self) -> CategoryRules {
        CategoryRules::new(self.categories)
    }
}
