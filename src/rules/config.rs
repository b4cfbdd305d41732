//! Loading conversion configuration from TOML

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::{CardOptions, RuleSet};
use crate::error::{ConfigError, PolicyViolation};

/// Everything a conversion run needs to know about policy.
///
/// Resolved once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub options: CardOptions,
}

impl ConversionConfig {
    pub fn new(rules: RuleSet, options: CardOptions) -> Self {
        Self { rules, options }
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded conversion config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), PolicyViolation> {
        self.rules.validate()?;
        self.options.validate()
    }
}
