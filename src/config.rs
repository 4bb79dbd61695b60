//! Tracer configuration.
//!
//! [`TracerConfig`] decides which trace records a [`TracingWriter`] forwards.
//! It deserializes from any serde format; TOML loading is available behind
//! the `config-file` feature.
//!
//! ```toml
//! min_level = "warn"
//! categories = ["action", "filters"]
//! include_values = false
//! ```
//!
//! [`TracingWriter`]: crate::observability::TracingWriter

use crate::observability::TraceLevel;
use serde::Deserialize;

/// Errors from loading or validating a [`TracerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config source could not be read.
    #[error("failed to read tracer config: {0}")]
    Io(#[from] std::io::Error),
    /// The config text is not valid for the format.
    #[error("failed to parse tracer config: {0}")]
    Parse(String),
    /// The config parsed but holds an invalid value.
    #[error("invalid tracer config: {0}")]
    Invalid(String),
}

/// Filtering rules for trace records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracerConfig {
    /// Records below this level are dropped.
    pub min_level: TraceLevel,
    /// Categories to keep. Empty keeps every category.
    pub categories: Vec<String>,
    /// Whether end records may carry formatted return values.
    pub include_values: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            min_level: TraceLevel::Info,
            categories: Vec::new(),
            include_values: true,
        }
    }
}

impl TracerConfig {
    /// Sets the minimum level.
    #[must_use]
    pub fn with_min_level(mut self, level: TraceLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Adds a category to the allow list.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Sets whether end records may carry values.
    #[must_use]
    pub fn with_include_values(mut self, include: bool) -> Self {
        self.include_values = include;
        self
    }

    /// Returns true if a record in `category` at `level` passes the filter.
    #[must_use]
    pub fn allows(&self, category: &str, level: TraceLevel) -> bool {
        level.is_at_least(self.min_level)
            && (self.categories.is_empty() || self.categories.iter().any(|c| c == category))
    }

    /// Checks the config for values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pos) = self.categories.iter().position(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "categories[{pos}] is empty"
            )));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
