//! Configuration types and parsing for quiver.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on fixed-point rewrite passes
pub const DEFAULT_MAX_ITERATIONS: usize = 16;

/// File names searched by [`Config::load_from_dir`], in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["quiver.yml", "quiver.yaml"];

/// Top-level configuration from quiver.yml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rewrite engine settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Rewrite engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Upper bound on fixed-point passes over the whole plan
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Per-rule on/off switches
    #[serde(default)]
    pub rules: RuleConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            rules: RuleConfig::default(),
        }
    }
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// Named rewrite rules, each enabled by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Specialize UDF calls using sibling filter predicates
    #[serde(default = "default_true")]
    pub predicate_pushdown_udf: bool,

    /// Drop upstream columns no ancestor references
    #[serde(default = "default_true")]
    pub column_pruning: bool,

    /// Merge adjacent filters
    #[serde(default = "default_true")]
    pub filter_coalescing: bool,

    /// Evaluate literal-only immutable calls
    #[serde(default = "default_true")]
    pub constant_folding: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            predicate_pushdown_udf: true,
            column_pruning: true,
            filter_coalescing: true,
            constant_folding: true,
        }
    }
}

impl RuleConfig {
    /// Every rule switched off
    pub fn none() -> Self {
        Self {
            predicate_pushdown_udf: false,
            column_pruning: false,
            filter_coalescing: false,
            constant_folding: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a directory containing quiver.yml or quiver.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .map(|p| Self::load(&p))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                })
            })
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.optimizer.max_iterations == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "optimizer.max_iterations must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
