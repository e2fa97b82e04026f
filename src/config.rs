//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via CHARFSA_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enumeration limits.
    pub enumeration: EnumerationConfig,
    /// Output formatting.
    pub output: OutputConfig,
}

impl Config {
    /// Loads configuration from `path` (or CHARFSA_CONFIG), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CHARFSA_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.enumeration.apply_env_overrides();
        self.output.apply_env_overrides();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enumeration.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "enumeration.max_length must be at least 1".to_string(),
            ));
        }
        if self.enumeration.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "enumeration.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bounds applied to enumeration, which has no cutoff of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationConfig {
    /// Maximum number of completions printed.
    pub max_results: usize,
    /// Maximum completion length in characters.
    pub max_length: usize,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_results: 1000,
            max_length: 32,
        }
    }
}

impl EnumerationConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(max) = std::env::var("CHARFSA_MAX_RESULTS") {
            if let Ok(n) = max.parse() {
                self.max_results = n;
            }
        }

        if let Ok(max) = std::env::var("CHARFSA_MAX_LENGTH") {
            if let Ok(n) = max.parse() {
                self.max_length = n;
            }
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Colorize terminal output.
    pub color: bool,
    /// Print scores next to completions.
    pub show_scores: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_scores: true,
        }
    }
}

impl OutputConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(color) = std::env::var("CHARFSA_COLOR") {
            self.color = color == "1" || color.to_lowercase() == "true";
        }

        if let Ok(show) = std::env::var("CHARFSA_SHOW_SCORES") {
            self.show_scores = show == "1" || show.to_lowercase() == "true";
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
