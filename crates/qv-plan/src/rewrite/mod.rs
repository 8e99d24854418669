//! Rule-based rewriting of plan DAGs.
//!
//! A rule matches a single node (looking at its inputs as needed) and either
//! returns a replacement, returns nothing, or declines with a
//! [`RewriteSafetyError`]. Declines are logged and never reach the caller:
//! an inapplicable rule is a no-op. The [`Optimizer`] drives the rules
//! bottom-up to a fixed point.

mod column_pruning;
mod constant_folding;
mod expr_utils;
mod filter_coalescing;
mod optimizer;
mod predicate_pushdown;

use crate::error::PlanError;
use crate::ir::rel::Rel;
use qv_core::RuleConfig;
use thiserror::Error;

pub use optimizer::{optimize, OptimizeReport, Optimizer};

/// Reason a rule declined to fire
#[derive(Error, Debug)]
pub(crate) enum RewriteSafetyError {
    /// A volatile call would be reordered, duplicated or dropped
    #[error("volatile call {0} cannot be moved")]
    VolatileCall(String),

    /// The rule could not prove its preservation invariant
    #[error("cannot prove {0}")]
    UnprovenConstraint(String),

    /// The UDF's specializer offered no narrowed body
    #[error("specializer of '{0}' declined")]
    SpecializerDeclined(String),

    /// The call already runs a specialized body
    #[error("'{0}' is already specialized")]
    AlreadySpecialized(String),

    /// A function failed on constant arguments
    #[error("evaluation of {expr} failed: {source}")]
    EvaluationFailed { expr: String, source: PlanError },

    /// Folding would turn a non-null expression into a null literal
    #[error("folding {0} would produce NULL for a non-null expression")]
    NullabilityWidened(String),

    /// Rebuilding the replacement failed validation
    #[error("rebuild failed: {0}")]
    Rebuild(#[from] PlanError),
}

pub(crate) type RewriteResult = Result<Option<Rel>, RewriteSafetyError>;

/// A pattern plus replacement over one plan node
pub(crate) trait RewriteRule: Send + Sync {
    /// Stable rule name, as used in configuration
    fn name(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Replacement for `rel`, `None` when the pattern does not match
    fn apply(&self, rel: &Rel) -> RewriteResult;
}

/// Names of the built-in rules in their default order
pub const RULE_NAMES: [&str; 4] = [
    constant_folding::NAME,
    filter_coalescing::NAME,
    predicate_pushdown::NAME,
    column_pruning::NAME,
];

/// Ordered set of enabled rewrite rules
pub struct RuleSet {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RuleSet {
    /// Every built-in rule in the default order
    pub fn with_defaults() -> Self {
        Self::from_config(&RuleConfig::default())
    }

    /// No rules; optimizing returns the input unchanged
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// The rules switched on in `config`, in the default order
    pub fn from_config(config: &RuleConfig) -> Self {
        let mut rules: Vec<Box<dyn RewriteRule>> = Vec::new();
        if config.constant_folding {
            rules.push(Box::new(constant_folding::ConstantFolding));
        }
        if config.filter_coalescing {
            rules.push(Box::new(filter_coalescing::FilterCoalescing));
        }
        if config.predicate_pushdown_udf {
            rules.push(Box::new(predicate_pushdown::PredicatePushdownUdf));
        }
        if config.column_pruning {
            rules.push(Box::new(column_pruning::ColumnPruning));
        }
        Self { rules }
    }

    /// Names of the enabled rules in application order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// `(name, description)` of the enabled rules
    pub fn descriptions(&self) -> Vec<(&'static str, &'static str)> {
        self.rules
            .iter()
            .map(|r| (r.name(), r.description()))
            .collect()
    }

    /// Number of enabled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is enabled
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &dyn RewriteRule> {
        self.rules.iter().map(|r| r.as_ref())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rule_names()).finish()
    }
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod tests;
