//! Front-end configuration.
//!
//! `defaults/cfront.default.toml` is embedded into the binary. Callers layer
//! user files and individual overrides on top of it with [`Loader`] before
//! deserializing into [`FrontendConfig`].

use crate::pass::PassId;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/cfront.default.toml");

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FrontendConfig {
    pub include: IncludeConfig,
    pub limits: LimitsConfig,
    pub preprocessor: PreprocessorConfig,
    pub plan: PlanConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IncludeConfig {
    #[serde(default)]
    pub user_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub system_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    pub max_include_depth: usize,
    /// Bounds recursion in the statement and expression parsers
    pub max_nesting_depth: usize,
    pub max_macro_expansion_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_include_depth: 200,
            max_nesting_depth: 256,
            max_macro_expansion_depth: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default)]
    pub defines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanConfig {
    #[serde(default)]
    pub passes: Vec<PassId>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            passes: vec![PassId::Preprocess, PassId::Parse],
        }
    }
}

/// Layers user configuration over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single `key = value` override, e.g. from `--set`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<FrontendConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<FrontendConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_default_impl() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config, FrontendConfig::default());
        assert_eq!(config.limits.max_nesting_depth, 256);
        assert_eq!(config.plan.passes, vec![PassId::Preprocess, PassId::Parse]);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("limits.max_include_depth", 8i64)
            .expect("override to apply")
            .set_override("include.recursive", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.limits.max_include_depth, 8);
        assert!(config.include.recursive);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new().with_file("/nonexistent/cfront.toml").build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/cfront.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.limits.max_macro_expansion_depth, 256);
    }
}
